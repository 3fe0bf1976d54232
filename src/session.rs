//! Per-test context: ingestion, live feedback and the final analysis.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::analysis::{analyze, AnalysisConfig, MechanicalProperties};
use crate::error::{TensileError, TensileResult};
use crate::feed::Frame;
use crate::live::{LiveAccumulator, LiveConfig, LiveState, TestStage};
use crate::sample::{DerivedSample, TestSample};
use crate::specimen::SpecimenGeometry;

/// One tensile test from first sample to final report.
///
/// The session is the single owner of the sample buffer and of the live
/// state. Samples are appended until [`TestSession::stop`], which freezes the
/// buffer and runs the batch analysis exactly once on the frozen copy.
#[derive(Debug)]
pub struct TestSession {
    geometry: SpecimenGeometry,
    analysis: AnalysisConfig,
    live: LiveAccumulator,
    samples: Vec<DerivedSample>,
    frozen: Option<Arc<[DerivedSample]>>,
    result: Option<MechanicalProperties>,
    dropped_frames: usize,
}

impl TestSession {
    /// Starts a test. The geometry is already validated by construction.
    pub fn new(geometry: SpecimenGeometry, analysis: AnalysisConfig, live: LiveConfig) -> Self {
        info!(
            "test started: gauge length {} mm, area {} mm²",
            geometry.gauge_length_mm(),
            geometry.cross_section_area_mm2()
        );
        TestSession {
            geometry,
            analysis,
            live: LiveAccumulator::new(live),
            samples: Vec::new(),
            frozen: None,
            result: None,
            dropped_frames: 0,
        }
    }

    pub fn geometry(&self) -> &SpecimenGeometry {
        &self.geometry
    }

    pub fn is_stopped(&self) -> bool {
        self.frozen.is_some()
    }

    /// Appends one sample and returns the updated live state.
    ///
    /// # Errors
    ///
    /// [`TensileError::TestStopped`] after [`stop`](Self::stop), and
    /// [`TensileError::OutOfOrder`] when `time` does not increase. Rejected
    /// samples leave the session untouched.
    pub fn push(&mut self, sample: TestSample) -> TensileResult<&LiveState> {
        if self.is_stopped() {
            return Err(TensileError::TestStopped);
        }
        if let Some(last) = self.samples.last() {
            if !(sample.time > last.time) {
                warn!("out-of-order sample at t={}s dropped", sample.time);
                return Err(TensileError::OutOfOrder {
                    time: sample.time,
                    last: last.time,
                });
            }
        }
        let derived = self
            .geometry
            .derive_with_limit(&sample, self.analysis.true_strain_limit);
        self.samples.push(derived);

        let before = self.live.state().stage;
        let state = self.live.update(&derived);
        if state.stage != before {
            debug!("stage {} -> {} at t={}s", before, state.stage, derived.time);
        }
        Ok(state)
    }

    /// Feeds one controller line. Returns `true` if it carried a sample that
    /// was accepted; everything else is dropped without failing the test.
    pub fn push_frame(&mut self, line: &str) -> bool {
        match Frame::parse(line) {
            Some(Frame::Data(record)) => match self.push(record.to_sample()) {
                Ok(_) => true,
                Err(e) => {
                    debug!("frame rejected: {}", e);
                    self.dropped_frames += 1;
                    false
                }
            },
            Some(_) => false,
            None => {
                if !line.trim().is_empty() {
                    warn!("dropping malformed frame: '{}'", line.trim());
                    self.dropped_frames += 1;
                }
                false
            }
        }
    }

    /// Copy of the live telemetry for display.
    pub fn snapshot(&self) -> LiveState {
        self.live.state().clone()
    }

    pub fn stage(&self) -> TestStage {
        self.live.state().stage
    }

    pub fn samples(&self) -> &[DerivedSample] {
        match &self.frozen {
            Some(frozen) => &frozen[..],
            None => &self.samples[..],
        }
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped_frames
    }

    /// Frozen samples, available once the test is stopped.
    pub fn frozen_samples(&self) -> Option<Arc<[DerivedSample]>> {
        self.frozen.clone()
    }

    /// Stops the test and computes the final result.
    ///
    /// Only the first call does any work and returns the result; later calls
    /// return `None`. Use [`result`](Self::result) to read it again.
    pub fn stop(&mut self) -> Option<&MechanicalProperties> {
        if self.is_stopped() {
            debug!("stop ignored: test already stopped");
            return None;
        }
        let frozen: Arc<[DerivedSample]> = std::mem::take(&mut self.samples).into();
        let props = analyze(&frozen, &self.analysis);
        info!(
            "test stopped after {} samples: UTS {:.2} MPa, E {:.0} MPa, {} ({})",
            props.sample_count,
            props.ultimate_tensile_strength,
            props.youngs_modulus,
            props.failure_type,
            props.validity_notes
        );
        self.frozen = Some(frozen);
        self.result = Some(props);
        self.result.as_ref()
    }

    pub fn result(&self) -> Option<&MechanicalProperties> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn session() -> TestSession {
        TestSession::new(
            SpecimenGeometry::new(50.0, 40.0).unwrap(),
            AnalysisConfig::default(),
            LiveConfig::default(),
        )
    }

    fn frame(i: usize) -> String {
        let strain = i as f64 * 1e-4;
        let stress = 20000.0 * strain.min(0.01);
        format!(
            "DATA {},{},{},{},{}",
            i as f64 * 100.0,
            stress * 40.0,
            strain * 50.0,
            stress,
            strain
        )
    }

    #[test]
    fn test_stop_runs_analysis_once() {
        let mut s = session();
        for i in 0..=300 {
            assert!(s.push_frame(&frame(i)));
        }
        let live_energy = s.snapshot().cumulative_energy_j;

        let first = s.stop().cloned().expect("first stop computes");
        assert!(first.is_valid);
        assert_relative_eq!(first.youngs_modulus, 20000.0, max_relative = 1e-6);
        assert_relative_eq!(first.energy_to_break, live_energy, max_relative = 1e-6);

        assert!(s.stop().is_none());
        assert_eq!(s.result(), Some(&first));
        assert_eq!(s.samples().len(), 301);
        assert!(matches!(s.push(TestSample::new(100.0, 1.0, 1.0)), Err(TensileError::TestStopped)));
    }

    #[test]
    fn test_malformed_and_out_of_order_frames_are_dropped() {
        let mut s = session();
        assert!(s.push_frame(&frame(0)));
        assert!(s.push_frame(&frame(1)));
        assert!(!s.push_frame("DATA 1,2,3"));
        assert!(!s.push_frame(&frame(1)));
        assert!(!s.push_frame("OK running"));
        assert!(!s.push_frame(""));
        assert_eq!(s.samples().len(), 2);
        assert_eq!(s.dropped_frames(), 2);
        assert_eq!(s.snapshot().sample_count, 2);
    }

    #[test]
    fn test_stress_recomputed_from_geometry() {
        let mut s = session();
        // Controller reports nonsense stress/strain; geometry wins.
        assert!(s.push_frame("DATA 0,400,0.5,999,999"));
        let sample = s.samples()[0];
        assert_relative_eq!(sample.stress, 10.0);
        assert_relative_eq!(sample.strain, 0.01);
    }

    #[test]
    fn test_short_test_is_insufficient() {
        let mut s = session();
        for i in 0..5 {
            s.push_frame(&frame(i));
        }
        let result = s.stop().expect("result");
        assert!(!result.is_valid);
        assert_eq!(result.validity_notes, "Insufficient data points");
        assert!(s.frozen_samples().is_some());
    }
}
