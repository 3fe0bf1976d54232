//! Incremental accumulation primitives shared by the live and batch paths.
//!
//! Both the live accumulator and the batch calculator push samples through
//! [`EnergyIntegrator`] in recording order, so the energy reported while the
//! test runs and the energy in the final report are the same sum.

use serde::Serialize;

use crate::sample::DerivedSample;

/// Energy of one trapezoid between two consecutive samples, in joules.
///
/// `d_extension_mm` is signed: a return stroke removes energy.
pub fn trapezoid_energy(force_prev_n: f64, force_curr_n: f64, d_extension_mm: f64) -> f64 {
    0.5 * (force_prev_n + force_curr_n) * d_extension_mm / 1000.0
}

/// Running trapezoidal integral of force over extension.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyIntegrator {
    total_j: f64,
    last: Option<(f64, f64)>,
}

impl EnergyIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one sample and returns the cumulative energy up to and including it.
    pub fn push(&mut self, force_n: f64, extension_mm: f64) -> f64 {
        if let Some((f0, x0)) = self.last {
            self.total_j += trapezoid_energy(f0, force_n, extension_mm - x0);
        }
        self.last = Some((force_n, extension_mm));
        self.total_j
    }

    pub fn total_j(&self) -> f64 {
        self.total_j
    }

    /// Cumulative energy at every sample of a recorded test.
    pub fn replay(samples: &[DerivedSample]) -> Vec<f64> {
        let mut integrator = EnergyIntegrator::new();
        samples
            .iter()
            .map(|s| integrator.push(s.force, s.extension))
            .collect()
    }
}

/// Area under the stress–strain curve of `samples`, in MJ/m³ (MPa × ratio).
pub fn strain_energy_density(samples: &[DerivedSample]) -> f64 {
    samples
        .windows(2)
        .map(|pair| 0.5 * (pair[0].stress + pair[1].stress) * (pair[1].strain - pair[0].strain))
        .sum()
}

/// First derivatives of the measured channels, per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    pub force_n_per_s: f64,
    pub extension_mm_per_s: f64,
    pub displacement_mm_per_s: f64,
    pub stress_mpa_per_s: f64,
    pub strain_per_s: f64,
}

impl Rates {
    /// Finite differences between two samples.
    ///
    /// Leaves the previous rates untouched and returns `false` when `dt` is not
    /// positive.
    pub fn update(&mut self, prev: &DerivedSample, curr: &DerivedSample) -> bool {
        let dt = curr.time - prev.time;
        if !(dt > 0.0) {
            return false;
        }
        self.force_n_per_s = (curr.force - prev.force) / dt;
        self.extension_mm_per_s = (curr.extension - prev.extension) / dt;
        self.displacement_mm_per_s = (curr.displacement - prev.displacement) / dt;
        self.stress_mpa_per_s = (curr.stress - prev.stress) / dt;
        self.strain_per_s = (curr.strain - prev.strain) / dt;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::TestSample;
    use crate::specimen::SpecimenGeometry;
    use approx::assert_relative_eq;

    fn derived(time: f64, force: f64, extension: f64) -> DerivedSample {
        SpecimenGeometry::new(50.0, 40.0)
            .unwrap()
            .derive(&TestSample::new(time, force, extension))
    }

    #[test]
    fn test_energy_trapezoids() {
        let mut e = EnergyIntegrator::new();
        assert_eq!(e.push(0.0, 0.0), 0.0);
        // 0.5 * (0 + 100 N) * 1 mm = 50 N·mm = 0.05 J
        assert_relative_eq!(e.push(100.0, 1.0), 0.05);
        assert_relative_eq!(e.push(100.0, 2.0), 0.15);
        // Return stroke integrates signed area.
        assert_relative_eq!(e.push(100.0, 1.5), 0.10, epsilon = 1e-12);
        assert_relative_eq!(e.total_j(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_replay_matches_push() {
        let samples: Vec<DerivedSample> = (0..50)
            .map(|i| derived(i as f64 * 0.1, (i as f64).sqrt() * 30.0, i as f64 * 0.02))
            .collect();
        let cumulative = EnergyIntegrator::replay(&samples);
        let mut e = EnergyIntegrator::new();
        for (s, c) in samples.iter().zip(&cumulative) {
            assert_eq!(e.push(s.force, s.extension), *c);
        }
    }

    #[test]
    fn test_strain_energy_density_matches_energy_per_volume() {
        // 0 → 400 N over 0.5 mm on a 50 mm × 40 mm² specimen.
        let samples: Vec<DerivedSample> = (0..=10)
            .map(|i| derived(i as f64, i as f64 * 40.0, i as f64 * 0.05))
            .collect();
        let density = strain_energy_density(&samples);
        assert_relative_eq!(density, 0.05, epsilon = 1e-12);
        let energy_j = EnergyIntegrator::replay(&samples)[10];
        let volume_m3 = 50.0 * 40.0 * 1e-9;
        assert_relative_eq!(energy_j / volume_m3 / 1e6, density, max_relative = 1e-9);
        assert_eq!(strain_energy_density(&samples[..1]), 0.0);
    }

    #[test]
    fn test_rates_skip_non_positive_dt() {
        let mut rates = Rates::default();
        assert!(rates.update(&derived(0.0, 0.0, 0.0), &derived(0.5, 10.0, 0.1)));
        assert_relative_eq!(rates.force_n_per_s, 20.0);
        assert_relative_eq!(rates.extension_mm_per_s, 0.2);
        assert_relative_eq!(rates.strain_per_s, 0.004);
        assert_relative_eq!(rates.stress_mpa_per_s, 0.5);

        let before = rates;
        assert!(!rates.update(&derived(0.5, 10.0, 0.1), &derived(0.5, 50.0, 0.3)));
        assert_eq!(rates, before);
    }
}
