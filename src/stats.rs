//! Descriptive statistics over a series of specimens.

use serde::Serialize;

use crate::analysis::MechanicalProperties;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Coefficient of variation in %, 0 when the mean is 0.
    pub cv: f64,
}

impl Statistics {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Statistics::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Statistics {
            count: values.len(),
            mean,
            std,
            min,
            max,
            cv: if mean != 0.0 { std / mean * 100.0 } else { 0.0 },
        }
    }
}

/// Statistics of the headline properties across the valid tests of a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub tests: usize,
    pub valid_tests: usize,
    pub ultimate_tensile_strength: Statistics,
    /// Only tests where a yield point was found.
    pub yield_strength: Statistics,
    pub youngs_modulus: Statistics,
    pub elongation_at_break: Statistics,
    pub energy_to_break: Statistics,
}

pub fn summarize(results: &[MechanicalProperties]) -> SeriesSummary {
    let valid: Vec<&MechanicalProperties> = results.iter().filter(|r| r.is_valid).collect();
    let stats_of = |f: fn(&MechanicalProperties) -> f64| -> Statistics {
        Statistics::from_values(&valid.iter().map(|&r| f(r)).collect::<Vec<_>>())
    };
    let yields: Vec<f64> = valid
        .iter()
        .filter(|r| r.has_yield_point())
        .map(|r| r.yield_strength)
        .collect();

    SeriesSummary {
        tests: results.len(),
        valid_tests: valid.len(),
        ultimate_tensile_strength: stats_of(|r| r.ultimate_tensile_strength),
        yield_strength: Statistics::from_values(&yields),
        youngs_modulus: stats_of(|r| r.youngs_modulus),
        elongation_at_break: stats_of(|r| r.elongation_at_break),
        energy_to_break: stats_of(|r| r.energy_to_break),
    }
}
