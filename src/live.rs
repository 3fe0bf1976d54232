//! Live per-sample feedback while a test is running.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::accumulate::{EnergyIntegrator, Rates};
use crate::error::{TensileError, TensileResult};
use crate::regression::fit_line;
use crate::sample::DerivedSample;

/// Heuristic phase of the running test, shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestStage {
    #[default]
    Idle,
    Starting,
    ElasticRegion,
    Yielding,
    StrainHardening,
    PostYield,
    BreakDetected,
}

impl fmt::Display for TestStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            TestStage::Idle => "Idle",
            TestStage::Starting => "Starting",
            TestStage::ElasticRegion => "Elastic Region",
            TestStage::Yielding => "Yielding",
            TestStage::StrainHardening => "Strain Hardening",
            TestStage::PostYield => "Post-Yield",
            TestStage::BreakDetected => "Break Detected",
        };
        write!(f, "{}", label)
    }
}

/// Thresholds for the live heuristics (`live` section of the configuration).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Samples in the sliding window used for the instantaneous modulus.
    pub modulus_window: usize,
    /// Minimum strain span across the modulus window before a slope is reported.
    pub min_modulus_strain_span: f64,
    /// Below this many samples the stage stays `Starting`.
    pub min_stage_samples: usize,
    /// Samples inspected for the yield plateau.
    pub plateau_window: usize,
    /// Break is flagged when force falls below this fraction of the running max.
    pub break_drop_fraction: f64,
    /// Running max force must exceed this (N) before a break can be flagged.
    pub break_min_force_n: f64,
    /// Strain below which a rising force counts as elastic loading.
    pub elastic_strain_limit: f64,
    /// Plateau when the window's stress span is below this fraction of max stress.
    pub plateau_stress_fraction: f64,
    /// Plateau only counts beyond this strain.
    pub plateau_min_strain: f64,
    /// Stress above this fraction of max stress counts as strain hardening.
    pub hardening_stress_fraction: f64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            modulus_window: 10,
            min_modulus_strain_span: 1e-6,
            min_stage_samples: 5,
            plateau_window: 20,
            break_drop_fraction: 0.5,
            break_min_force_n: 10.0,
            elastic_strain_limit: 0.01,
            plateau_stress_fraction: 0.05,
            plateau_min_strain: 0.005,
            hardening_stress_fraction: 0.8,
        }
    }
}

impl LiveConfig {
    pub fn validate(&self) -> TensileResult<()> {
        if self.modulus_window < 2 {
            return Err(TensileError::InvalidConfig(format!(
                "modulus_window must be at least 2, got {}",
                self.modulus_window
            )));
        }
        if self.plateau_window < 2 {
            return Err(TensileError::InvalidConfig(format!(
                "plateau_window must be at least 2, got {}",
                self.plateau_window
            )));
        }
        if self.min_stage_samples < 1 {
            return Err(TensileError::InvalidConfig(format!(
                "min_stage_samples must be at least 1, got {}",
                self.min_stage_samples
            )));
        }
        if !(self.break_drop_fraction > 0.0 && self.break_drop_fraction < 1.0) {
            return Err(TensileError::InvalidConfig(format!(
                "break_drop_fraction must be between 0.0 and 1.0, got {}",
                self.break_drop_fraction
            )));
        }
        for (name, value) in [
            ("plateau_stress_fraction", self.plateau_stress_fraction),
            ("hardening_stress_fraction", self.hardening_stress_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(TensileError::InvalidConfig(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [
            ("min_modulus_strain_span", self.min_modulus_strain_span),
            ("break_min_force_n", self.break_min_force_n),
            ("elastic_strain_limit", self.elastic_strain_limit),
            ("plateau_min_strain", self.plateau_min_strain),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TensileError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Read-only telemetry snapshot for on-screen display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveState {
    pub sample_count: usize,
    pub current_force: f64,
    pub current_extension: f64,
    pub current_stress: f64,
    pub current_strain: f64,
    pub current_true_stress: Option<f64>,
    pub current_true_strain: Option<f64>,
    pub rates: Rates,
    pub cumulative_energy_j: f64,
    pub instantaneous_modulus: f64,
    pub max_force: f64,
    pub max_stress: f64,
    pub stage: TestStage,
}

/// Owns the live state of one test. Nothing else mutates it.
#[derive(Debug, Clone)]
pub struct LiveAccumulator {
    config: LiveConfig,
    state: LiveState,
    prev: Option<DerivedSample>,
    energy: EnergyIntegrator,
    modulus_window: VecDeque<(f64, f64)>,
    plateau_window: VecDeque<f64>,
}

impl LiveAccumulator {
    pub fn new(config: LiveConfig) -> Self {
        let modulus_capacity = config.modulus_window;
        let plateau_capacity = config.plateau_window;
        LiveAccumulator {
            config,
            state: LiveState::default(),
            prev: None,
            energy: EnergyIntegrator::new(),
            modulus_window: VecDeque::with_capacity(modulus_capacity),
            plateau_window: VecDeque::with_capacity(plateau_capacity),
        }
    }

    pub fn state(&self) -> &LiveState {
        &self.state
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Clears everything for a new test.
    pub fn reset(&mut self) {
        *self = LiveAccumulator::new(self.config.clone());
    }

    /// Folds one sample into the running state.
    pub fn update(&mut self, curr: &DerivedSample) -> &LiveState {
        let state = &mut self.state;
        state.sample_count += 1;
        state.current_force = curr.force;
        state.current_extension = curr.extension;
        state.current_stress = curr.stress;
        state.current_strain = curr.strain;
        state.current_true_stress = curr.true_values.map(|t| t.stress);
        state.current_true_strain = curr.true_values.map(|t| t.strain);
        if state.sample_count == 1 || curr.force > state.max_force {
            state.max_force = curr.force;
        }
        if state.sample_count == 1 || curr.stress > state.max_stress {
            state.max_stress = curr.stress;
        }

        if let Some(prev) = &self.prev {
            state.rates.update(prev, curr);
        }
        state.cumulative_energy_j = self.energy.push(curr.force, curr.extension);

        push_bounded(&mut self.modulus_window, (curr.strain, curr.stress), self.config.modulus_window);
        push_bounded(&mut self.plateau_window, curr.stress, self.config.plateau_window);
        self.update_modulus();

        self.state.stage = self.classify_stage(curr);
        self.prev = Some(*curr);
        &self.state
    }

    fn update_modulus(&mut self) {
        if self.modulus_window.len() < self.config.modulus_window {
            return;
        }
        let (first, last) = match (self.modulus_window.front(), self.modulus_window.back()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => return,
        };
        if last - first <= self.config.min_modulus_strain_span {
            return;
        }
        let (strain, stress): (Vec<f64>, Vec<f64>) = self.modulus_window.iter().copied().unzip();
        if let Some(fit) = fit_line(&strain, &stress) {
            self.state.instantaneous_modulus = fit.slope;
        }
    }

    // Order matters: a break overrides every other stage.
    fn classify_stage(&self, curr: &DerivedSample) -> TestStage {
        let c = &self.config;
        let s = &self.state;
        if s.sample_count < c.min_stage_samples {
            return TestStage::Starting;
        }
        if curr.force < c.break_drop_fraction * s.max_force && s.max_force > c.break_min_force_n {
            return TestStage::BreakDetected;
        }
        if curr.strain < c.elastic_strain_limit && s.rates.force_n_per_s > 0.0 {
            return TestStage::ElasticRegion;
        }
        if s.sample_count > c.plateau_window && curr.strain > c.plateau_min_strain {
            let (lo, hi) = self
                .plateau_window
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
            if hi - lo < c.plateau_stress_fraction * s.max_stress {
                return TestStage::Yielding;
            }
        }
        if curr.stress > c.hardening_stress_fraction * s.max_stress {
            TestStage::StrainHardening
        } else {
            TestStage::PostYield
        }
    }
}

impl Default for LiveAccumulator {
    fn default() -> Self {
        LiveAccumulator::new(LiveConfig::default())
    }
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    if window.len() == capacity {
        window.pop_front();
    }
    window.push_back(value);
}
