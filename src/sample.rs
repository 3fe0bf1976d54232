//! Raw test samples and the derived stress/strain channels.

use serde::{Deserialize, Serialize};

use crate::specimen::SpecimenGeometry;

/// Engineering strain beyond which the true stress/strain transform is not trusted.
pub const TRUE_STRAIN_LIMIT: f64 = 0.5;

/// One recorded sample, in the order it came off the machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestSample {
    /// Seconds since test start.
    pub time: f64,
    /// Newtons.
    pub force: f64,
    /// Millimetres, measured over the gauge length.
    pub extension: f64,
    /// Crosshead displacement in millimetres.
    pub displacement: f64,
}

impl TestSample {
    /// Sample without a separate crosshead channel: displacement follows extension.
    pub fn new(time: f64, force: f64, extension: f64) -> Self {
        TestSample {
            time,
            force,
            extension,
            displacement: extension,
        }
    }
}

/// True (instantaneous-geometry) stress and strain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrueValues {
    pub stress: f64,
    pub strain: f64,
}

/// A sample together with its engineering and true channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedSample {
    pub time: f64,
    pub force: f64,
    pub extension: f64,
    pub displacement: f64,
    /// Engineering stress in MPa (N/mm²).
    pub stress: f64,
    /// Engineering strain as a ratio.
    pub strain: f64,
    /// `None` outside the domain where the transform holds.
    pub true_values: Option<TrueValues>,
}

/// `ε_true = ln(1+ε)`, `σ_true = σ·(1+ε)`, valid only for `-1 < ε < limit`.
pub fn true_values(stress: f64, strain: f64, limit: f64) -> Option<TrueValues> {
    if !(stress.is_finite() && strain.is_finite()) || strain <= -1.0 || strain >= limit {
        return None;
    }
    Some(TrueValues {
        stress: stress * (1.0 + strain),
        strain: strain.ln_1p(),
    })
}

/// Computes stress and strain from raw dimensions.
///
/// Non-positive (or NaN) gauge length or area yield NaN stress/strain and no
/// true values; callers holding a [`SpecimenGeometry`] never hit that branch.
pub fn derive(
    sample: &TestSample,
    gauge_length_mm: f64,
    cross_section_area_mm2: f64,
    true_strain_limit: f64,
) -> DerivedSample {
    let (stress, strain) = if gauge_length_mm > 0.0 && cross_section_area_mm2 > 0.0 {
        (
            sample.force / cross_section_area_mm2,
            sample.extension / gauge_length_mm,
        )
    } else {
        (f64::NAN, f64::NAN)
    };
    DerivedSample {
        time: sample.time,
        force: sample.force,
        extension: sample.extension,
        displacement: sample.displacement,
        stress,
        strain,
        true_values: true_values(stress, strain, true_strain_limit),
    }
}

impl SpecimenGeometry {
    pub fn derive(&self, sample: &TestSample) -> DerivedSample {
        self.derive_with_limit(sample, TRUE_STRAIN_LIMIT)
    }

    pub fn derive_with_limit(&self, sample: &TestSample, true_strain_limit: f64) -> DerivedSample {
        derive(
            sample,
            self.gauge_length_mm(),
            self.cross_section_area_mm2(),
            true_strain_limit,
        )
    }

    /// Derives a whole recorded test.
    pub fn derive_all(&self, samples: &[TestSample], true_strain_limit: f64) -> Vec<DerivedSample> {
        samples
            .iter()
            .map(|s| self.derive_with_limit(s, true_strain_limit))
            .collect()
    }
}
