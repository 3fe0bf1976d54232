//! Curves for plotting a completed test.

use crate::analysis::MechanicalProperties;
use crate::sample::DerivedSample;

/// `(x, y)` pairs ready for a plotting collaborator.
pub type Curve = Vec<(f64, f64)>;

/// Strain limit of the drawn modulus line.
const MODULUS_LINE_STRAIN: f64 = 0.01;

pub fn stress_strain(samples: &[DerivedSample]) -> Curve {
    samples.iter().map(|s| (s.strain, s.stress)).collect()
}

pub fn force_extension(samples: &[DerivedSample]) -> Curve {
    samples.iter().map(|s| (s.extension, s.force)).collect()
}

/// True stress vs true strain up to and including the UTS sample.
///
/// Stops early at the first sample outside the transform's valid domain.
pub fn true_stress_strain(samples: &[DerivedSample], props: &MechanicalProperties) -> Curve {
    let end = (props.uts_index + 1).min(samples.len());
    samples[..end]
        .iter()
        .map_while(|s| s.true_values.map(|t| (t.strain, t.stress)))
        .collect()
}

/// Straight line through the origin with the fitted modulus.
pub fn modulus_line(props: &MechanicalProperties) -> Curve {
    vec![
        (0.0, 0.0),
        (MODULUS_LINE_STRAIN, props.youngs_modulus * MODULUS_LINE_STRAIN),
    ]
}

/// The offset line `σ = E·(ε − offset)`, drawn to half the final strain (at least 2 %).
pub fn offset_line(samples: &[DerivedSample], props: &MechanicalProperties, offset: f64) -> Curve {
    let max_strain = samples
        .iter()
        .map(|s| s.strain)
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    let end = (max_strain * 0.5).max(0.02);
    vec![
        (offset, 0.0),
        (end, props.youngs_modulus * (end - offset)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, AnalysisConfig};
    use crate::sample::TestSample;
    use crate::specimen::SpecimenGeometry;
    use approx::assert_relative_eq;

    fn specimen() -> Vec<DerivedSample> {
        let g = SpecimenGeometry::new(50.0, 40.0).unwrap();
        (0..=400)
            .map(|i| {
                let strain = i as f64 * 1e-4;
                let stress = 20000.0 * strain.min(0.01) + if strain > 0.02 { 1000.0 * (0.04 - strain) } else { 0.0 };
                g.derive(&TestSample::new(i as f64 * 0.1, stress * 40.0, strain * 50.0))
            })
            .collect()
    }

    #[test]
    fn test_curves() {
        let samples = specimen();
        let props = analyze(&samples, &AnalysisConfig::default());

        assert_eq!(stress_strain(&samples).len(), samples.len());
        assert_eq!(force_extension(&samples)[10], (samples[10].extension, samples[10].force));

        let truth = true_stress_strain(&samples, &props);
        assert_eq!(truth.len(), props.uts_index + 1);
        assert!(truth.iter().all(|(e, s)| e.is_finite() && s.is_finite()));

        let m = modulus_line(&props);
        assert_relative_eq!(m[1].1, props.youngs_modulus * 0.01);

        let o = offset_line(&samples, &props, 0.002);
        assert_eq!(o[0], (0.002, 0.0));
        assert_relative_eq!(o[1].0, 0.02);
    }
}
