//! Batch calculation of mechanical properties from a completed test.
//!
//! [`analyze`] works on a frozen slice of samples and always returns a value.
//! Anything that prevents a property from being determined ends up as a note
//! in [`MechanicalProperties::validity_notes`].

use log::debug;
use serde::{Deserialize, Serialize};

use crate::accumulate::{strain_energy_density, EnergyIntegrator};
use crate::error::{TensileError, TensileResult};
use crate::failure::{classify, FailureThresholds, FailureType};
use crate::regression::fit_line;
use crate::sample::{true_values, DerivedSample, TRUE_STRAIN_LIMIT};
use crate::validation::{assess, QualityThresholds};

/// Note attached to results computed from too few samples.
pub const INSUFFICIENT_DATA_NOTE: &str = "Insufficient data points";

/// Inclusive strain interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainWindow {
    pub start: f64,
    pub end: f64,
}

impl StrainWindow {
    pub fn contains(&self, strain: f64) -> bool {
        strain >= self.start && strain <= self.end
    }
}

/// The `analysis` section of the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fewer samples than this produce the insufficient-data result.
    pub min_samples: usize,
    /// Plastic strain offset for the proof stress (0.002 = Rp0.2).
    pub yield_offset: f64,
    /// Primary strain window for the modulus regression.
    pub modulus_window: StrainWindow,
    /// Used when the primary window holds too few points.
    pub fallback_modulus_window: StrainWindow,
    /// Minimum points in a window for a regression.
    pub min_fit_points: usize,
    /// Strain at which the secant modulus is taken (0.01 = 1 %).
    pub secant_strain: f64,
    /// Break is the first post-peak sample below this fraction of max force.
    pub break_drop_fraction: f64,
    /// Upper engineering strain for true stress/strain.
    pub true_strain_limit: f64,
    pub failure: FailureThresholds,
    pub quality: QualityThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            min_samples: 10,
            yield_offset: 0.002,
            modulus_window: StrainWindow {
                start: 0.0005,
                end: 0.0025,
            },
            fallback_modulus_window: StrainWindow {
                start: 0.0001,
                end: 0.01,
            },
            min_fit_points: 5,
            secant_strain: 0.01,
            break_drop_fraction: 0.5,
            true_strain_limit: TRUE_STRAIN_LIMIT,
            failure: FailureThresholds::default(),
            quality: QualityThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validates the analysis parameters.
    ///
    /// # Returns
    ///
    /// `Ok(())` when every threshold is in range, otherwise
    /// [`TensileError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> TensileResult<()> {
        if self.min_samples < 2 {
            return Err(TensileError::InvalidConfig(format!(
                "min_samples must be at least 2, got {}",
                self.min_samples
            )));
        }
        if self.min_fit_points < 2 {
            return Err(TensileError::InvalidConfig(format!(
                "min_fit_points must be at least 2, got {}",
                self.min_fit_points
            )));
        }
        if !(self.yield_offset.is_finite() && self.yield_offset > 0.0) {
            return Err(TensileError::InvalidConfig(format!(
                "yield_offset must be greater than 0.0, got {}",
                self.yield_offset
            )));
        }
        if !(self.secant_strain.is_finite() && self.secant_strain > 0.0) {
            return Err(TensileError::InvalidConfig(format!(
                "secant_strain must be greater than 0.0, got {}",
                self.secant_strain
            )));
        }
        for (name, w) in [
            ("modulus_window", self.modulus_window),
            ("fallback_modulus_window", self.fallback_modulus_window),
        ] {
            if !(w.start.is_finite() && w.end.is_finite() && w.start < w.end) {
                return Err(TensileError::InvalidConfig(format!(
                    "{} start must be below end, got [{}, {}]",
                    name, w.start, w.end
                )));
            }
        }
        if !(self.break_drop_fraction > 0.0 && self.break_drop_fraction < 1.0) {
            return Err(TensileError::InvalidConfig(format!(
                "break_drop_fraction must be between 0.0 and 1.0, got {}",
                self.break_drop_fraction
            )));
        }
        if !(self.true_strain_limit > 0.0) {
            return Err(TensileError::InvalidConfig(format!(
                "true_strain_limit must be greater than 0.0, got {}",
                self.true_strain_limit
            )));
        }
        self.failure.validate()?;
        self.quality.validate()?;
        Ok(())
    }
}

/// Properties of one completed tensile test.
///
/// Stresses in MPa, strains as ratios, elongations in %, forces in N,
/// extensions in mm, energies in J. A zero yield strength means no yield
/// point was identified, not a zero-strength material.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MechanicalProperties {
    /// Number of samples analysed. Reported even for the insufficient-data
    /// result, where every property field is zero.
    pub sample_count: usize,

    pub ultimate_tensile_strength: f64,
    pub max_force: f64,
    pub force_at_uts: f64,
    pub strain_at_uts: f64,
    pub extension_at_uts: f64,
    pub uniform_elongation: f64,

    pub yield_strength: f64,
    pub force_at_yield: f64,
    pub strain_at_yield: f64,
    pub extension_at_yield: f64,

    pub youngs_modulus: f64,
    pub modulus_r_squared: f64,
    /// Stress over strain at the sample nearest the configured secant strain.
    pub secant_modulus: f64,

    pub break_stress: f64,
    pub force_at_break: f64,
    pub strain_at_break: f64,
    pub extension_at_break: f64,
    pub elongation_at_break: f64,
    /// `false` when no force drop was found and the last sample was used.
    pub break_detected: bool,

    pub energy_to_yield: f64,
    pub energy_to_uts: f64,
    pub energy_to_break: f64,
    /// Area under the stress–strain curve up to yield, in MJ/m³.
    pub resilience: f64,

    pub true_stress_at_uts: f64,
    pub true_strain_at_uts: f64,
    /// `false` when strain at UTS is outside the range where true values hold.
    pub true_values_valid: bool,
    /// True strain at the break sample; 0 outside the valid strain range.
    pub true_strain_at_break: f64,

    pub uts_index: usize,
    pub break_index: usize,
    pub yield_index: Option<usize>,

    pub failure_type: FailureType,
    pub is_valid: bool,
    pub validity_notes: String,
}

impl MechanicalProperties {
    /// The zeroed, invalid result for a test with too few samples.
    pub fn insufficient(sample_count: usize) -> Self {
        MechanicalProperties {
            sample_count,
            is_valid: false,
            validity_notes: INSUFFICIENT_DATA_NOTE.to_string(),
            ..MechanicalProperties::default()
        }
    }

    /// `true` when the offset construction found a crossing.
    pub fn has_yield_point(&self) -> bool {
        self.yield_index.is_some()
    }
}

/// Modulus regression result.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModulusFit {
    pub modulus: f64,
    pub r_squared: f64,
    pub points: usize,
}

/// Offset-line crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldPoint {
    /// First sample at or below the offset line.
    pub index: usize,
    pub stress: f64,
    pub strain: f64,
    pub force: f64,
    pub extension: f64,
}

/// Index of the first maximum; NaN values are skipped.
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// First sample at or after the force peak whose force falls below
/// `drop_fraction × max force`.
///
/// Returns `(index, detected)`; without a drop the last sample is used. The
/// index is never before the force peak.
pub fn find_break_point(samples: &[DerivedSample], drop_fraction: f64) -> Option<(usize, bool)> {
    let peak = argmax(samples.iter().map(|s| s.force))?;
    let threshold = drop_fraction * samples[peak].force;
    let found = samples[peak..]
        .iter()
        .position(|s| s.force < threshold)
        .map(|offset| peak + offset);
    Some(match found {
        Some(i) => (i, true),
        None => (samples.len() - 1, false),
    })
}

/// Least-squares modulus over the configured strain window, widening once.
pub fn youngs_modulus(samples: &[DerivedSample], config: &AnalysisConfig) -> ModulusFit {
    let select = |w: StrainWindow| -> (Vec<f64>, Vec<f64>) {
        samples
            .iter()
            .filter(|s| w.contains(s.strain))
            .map(|s| (s.strain, s.stress))
            .unzip()
    };

    let (mut strain, mut stress) = select(config.modulus_window);
    if strain.len() < config.min_fit_points {
        debug!(
            "modulus window holds {} points, widening to [{}, {}]",
            strain.len(),
            config.fallback_modulus_window.start,
            config.fallback_modulus_window.end
        );
        (strain, stress) = select(config.fallback_modulus_window);
    }
    if strain.len() < config.min_fit_points {
        return ModulusFit::default();
    }

    match fit_line(&strain, &stress) {
        Some(fit) => ModulusFit {
            modulus: fit.slope,
            r_squared: fit.r_squared,
            points: strain.len(),
        },
        None => ModulusFit::default(),
    }
}

/// Secant modulus at the sample whose strain is nearest `at_strain`.
///
/// Ties resolve to the earlier sample; 0 when that sample has no positive strain.
pub fn secant_modulus(samples: &[DerivedSample], at_strain: f64) -> f64 {
    samples
        .iter()
        .filter(|s| s.strain.is_finite())
        .min_by(|a, b| (a.strain - at_strain).abs().total_cmp(&(b.strain - at_strain).abs()))
        .filter(|s| s.strain > 0.0)
        .map_or(0.0, |s| s.stress / s.strain)
}

/// Offset-method yield point: the first place the curve drops from above the
/// line `σ = E·(ε − offset)` to on or below it.
///
/// Samples are scanned in recording order and the first crossing wins, so a
/// local stress dip before general yield is reported as the yield point.
pub fn offset_yield(samples: &[DerivedSample], modulus: f64, offset: f64) -> Option<YieldPoint> {
    if !(modulus > 0.0) {
        return None;
    }
    let diff = |s: &DerivedSample| s.stress - modulus * (s.strain - offset);

    samples.windows(2).enumerate().find_map(|(i, pair)| {
        let (a, b) = (&pair[0], &pair[1]);
        let (d0, d1) = (diff(a), diff(b));
        if !(d0 > 0.0 && d1 <= 0.0) {
            return None;
        }
        let t = d0 / (d0 - d1);
        let lerp = |x0: f64, x1: f64| x0 + t * (x1 - x0);
        Some(YieldPoint {
            index: i + 1,
            stress: lerp(a.stress, b.stress),
            strain: lerp(a.strain, b.strain),
            force: lerp(a.force, b.force),
            extension: lerp(a.extension, b.extension),
        })
    })
}

/// Computes every property of a completed test.
///
/// Calling it twice on the same slice yields identical results.
pub fn analyze(samples: &[DerivedSample], config: &AnalysisConfig) -> MechanicalProperties {
    let n = samples.len();
    if n < config.min_samples.max(1) {
        return MechanicalProperties::insufficient(n);
    }
    let (uts_index, (break_index, break_detected)) = match (
        argmax(samples.iter().map(|s| s.stress)),
        find_break_point(samples, config.break_drop_fraction),
    ) {
        (Some(uts), Some(brk)) => (uts, brk),
        // Every stress or force is NaN.
        _ => return MechanicalProperties::insufficient(n),
    };

    let uts = &samples[uts_index];
    let brk = &samples[break_index];
    let max_force = samples[argmax(samples.iter().map(|s| s.force)).unwrap_or(uts_index)].force;

    let fit = youngs_modulus(samples, config);
    let yield_point = offset_yield(samples, fit.modulus, config.yield_offset);
    debug!(
        "modulus {:.1} MPa (R²={:.4}, {} points), yield {:?}",
        fit.modulus, fit.r_squared, fit.points, yield_point
    );

    let cumulative = EnergyIntegrator::replay(samples);
    let energy_to_yield = yield_point
        .map(|y| cumulative[y.index - 1])
        .unwrap_or(0.0);
    // Same end point as the energy to yield: the last sample above the offset line.
    let resilience = yield_point.map_or(0.0, |y| strain_energy_density(&samples[..y.index]));

    let true_at_uts = true_values(uts.stress, uts.strain, config.true_strain_limit);
    let true_at_break = true_values(brk.stress, brk.strain, config.true_strain_limit);

    let mut props = MechanicalProperties {
        sample_count: n,

        ultimate_tensile_strength: uts.stress,
        max_force,
        force_at_uts: uts.force,
        strain_at_uts: uts.strain,
        extension_at_uts: uts.extension,
        uniform_elongation: uts.strain * 100.0,

        yield_strength: yield_point.map_or(0.0, |y| y.stress),
        force_at_yield: yield_point.map_or(0.0, |y| y.force),
        strain_at_yield: yield_point.map_or(0.0, |y| y.strain),
        extension_at_yield: yield_point.map_or(0.0, |y| y.extension),

        youngs_modulus: fit.modulus,
        modulus_r_squared: fit.r_squared,
        secant_modulus: secant_modulus(samples, config.secant_strain),

        break_stress: brk.stress,
        force_at_break: brk.force,
        strain_at_break: brk.strain,
        extension_at_break: brk.extension,
        elongation_at_break: brk.strain * 100.0,
        break_detected,

        energy_to_yield,
        energy_to_uts: cumulative[uts_index],
        energy_to_break: cumulative[n - 1],
        resilience,

        true_stress_at_uts: true_at_uts.map_or(0.0, |t| t.stress),
        true_strain_at_uts: true_at_uts.map_or(0.0, |t| t.strain),
        true_values_valid: true_at_uts.is_some(),
        true_strain_at_break: true_at_break.map_or(0.0, |t| t.strain),

        uts_index,
        break_index,
        yield_index: yield_point.map(|y| y.index),

        failure_type: classify(samples, uts_index, break_index, &config.failure),
        is_valid: false,
        validity_notes: String::new(),
    };

    let assessment = assess(&props, &config.quality);
    props.is_valid = assessment.is_valid;
    props.validity_notes = assessment.summary();
    props
}
