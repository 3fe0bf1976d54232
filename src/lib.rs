// src/lib.rs
//! Mechanical-properties engine for a tensile testing machine.
//!
//! Samples flow from the controller into a [`session::TestSession`], which
//! derives stress/strain, keeps the live telemetry up to date and, when the
//! test stops, runs [`analysis::analyze`] once on the frozen samples.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod accumulate;
pub mod analysis;
pub mod app_logic;
pub mod config;
pub mod curves;
pub mod error;
pub mod failure;
pub mod feed;
pub mod live;
pub mod regression;
pub mod sample;
pub mod session;
pub mod specimen;
pub mod stats;
pub mod validation;

pub use analysis::{analyze, AnalysisConfig, MechanicalProperties};
pub use error::{TensileError, TensileResult};
pub use failure::FailureType;
pub use live::{LiveAccumulator, LiveState, TestStage};
pub use sample::{DerivedSample, TestSample};
pub use session::TestSession;
pub use specimen::SpecimenGeometry;

/// Analyses parallel arrays of time (s), force (N) and extension (mm) and
/// returns the result as JSON. Invalid geometry yields `{"error": ...}`.
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn analyze_arrays(
    time: &[f64],
    force: &[f64],
    extension: &[f64],
    gauge_length_mm: f64,
    cross_section_area_mm2: f64,
) -> String {
    let geometry = match SpecimenGeometry::new(gauge_length_mm, cross_section_area_mm2) {
        Ok(geometry) => geometry,
        Err(e) => return serde_json::json!({ "error": e.to_string() }).to_string(),
    };
    let config = AnalysisConfig::default();
    let samples: Vec<DerivedSample> = time
        .iter()
        .zip(force)
        .zip(extension)
        .map(|((t, f), x)| geometry.derive_with_limit(&TestSample::new(*t, *f, *x), config.true_strain_limit))
        .collect();
    serde_json::to_string(&analyze(&samples, &config)).unwrap_or_default()
}
