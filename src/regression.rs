//! Least-squares line fitting used for the elastic modulus.

use nalgebra::{DMatrix, DVector};

/// Result of fitting `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0 when `y` has no variance.
    pub r_squared: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares over paired samples.
///
/// `x` is centred before the SVD solve so that small strains (1e-4 .. 1e-2)
/// do not degrade the conditioning of the design matrix. Returns `None` for
/// fewer than two points, zero variance in `x`, or non-finite input.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|v| (v - mean_x).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }

    // Columns: [1, x - mean_x]
    let design = DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { x[r] - mean_x });
    let rhs = DVector::from_column_slice(y);
    let svd = design.svd(true, true);
    let solution = svd.solve(&rhs, 1e-12).ok()?;

    let slope = solution[1];
    let intercept = solution[0] - slope * mean_x;
    if !(slope.is_finite() && intercept.is_finite()) {
        return None;
    }

    let mean_y = y.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean_y).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Some(LinearFit {
        slope,
        intercept,
        r_squared,
    })
}
