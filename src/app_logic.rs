//! A module for the main application logic of the tensile test tool
use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::analysis::{analyze, MechanicalProperties};
use crate::config::{load_config, Config};
use crate::feed::{read_samples_csv_file, Frame};
use crate::live::TestStage;
use crate::stats::{summarize, SeriesSummary};

#[derive(Debug, Serialize)]
pub struct SpecimenReport {
    pub file: PathBuf,
    pub properties: MechanicalProperties,
}

#[derive(Debug, Serialize)]
pub struct SeriesReport {
    pub specimens: Vec<SpecimenReport>,
    pub summary: SeriesSummary,
}

fn load_valid_config(config_path: &str) -> Result<Config> {
    let conf = load_config(config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path))?;
    conf.validate().context("Invalid configuration")?;
    Ok(conf)
}

/// Analyses one recorded test file.
pub fn analyze_file(conf: &Config, path: &Path) -> Result<SpecimenReport> {
    let geometry = conf.specimen.geometry()?;
    let raw = read_samples_csv_file(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    let samples = geometry.derive_all(&raw, conf.analysis.true_strain_limit);
    let properties = analyze(&samples, &conf.analysis);
    info!(
        "{}: {} samples, UTS {:.2} MPa, {}",
        path.display(),
        samples.len(),
        properties.ultimate_tensile_strength,
        properties.validity_notes
    );
    Ok(SpecimenReport {
        file: path.to_path_buf(),
        properties,
    })
}

/// Batch-analyses recorded specimens in parallel and summarises the series.
pub fn run_analyze(config_path: &str, files: &[PathBuf]) -> Result<SeriesReport> {
    let conf = load_valid_config(config_path)?;
    let specimens = files
        .par_iter()
        .map(|path| analyze_file(&conf, path))
        .collect::<Result<Vec<_>>>()?;
    let results: Vec<MechanicalProperties> = specimens.iter().map(|s| s.properties.clone()).collect();
    Ok(SeriesReport {
        summary: summarize(&results),
        specimens,
    })
}

/// Replays a captured controller log through a live session.
pub fn run_replay(config_path: &str, frames_path: &Path) -> Result<MechanicalProperties> {
    let conf = load_valid_config(config_path)?;
    let mut session = conf.start_session()?;
    let file = File::open(frames_path)
        .with_context(|| format!("Failed to open frame log {}", frames_path.display()))?;

    let mut stage = TestStage::Idle;
    for line in BufReader::new(file).lines() {
        let line = line?;
        match Frame::parse(&line) {
            Some(Frame::Error(msg)) => warn!("controller error: {}", msg),
            Some(Frame::Status(status)) => info!(
                "controller {} F={} N P={} mm running={}",
                status.state, status.force_n, status.position_mm, status.running
            ),
            _ => {}
        }
        if session.push_frame(&line) && session.stage() != stage {
            stage = session.stage();
            let live = session.snapshot();
            info!(
                "{} at {:.3} s: {:.2} MPa, {:.4} J",
                stage,
                session.samples().last().map_or(0.0, |s| s.time),
                live.current_stress,
                live.cumulative_energy_j
            );
        }
    }
    if session.dropped_frames() > 0 {
        warn!("{} frames dropped", session.dropped_frames());
    }

    session
        .stop()
        .cloned()
        .context("Test was already stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_run_analyze_fixture() {
        let report = run_analyze("tests/config.yaml", &[PathBuf::from("tests/data/specimen.csv")])
            .expect("analysis");
        assert_eq!(report.specimens.len(), 1);
        let props = &report.specimens[0].properties;
        assert!(props.is_valid, "{}", props.validity_notes);
        assert_relative_eq!(props.youngs_modulus, 20000.0, max_relative = 1e-6);
        assert_relative_eq!(props.yield_strength, 200.0, epsilon = 1e-6);
        assert!(props.break_detected);
        assert_eq!(props.break_index, 301);
        assert_eq!(report.summary.valid_tests, 1);
    }

    #[test]
    fn test_replay_matches_batch() {
        let replayed = run_replay("tests/config.yaml", Path::new("tests/data/specimen.log")).expect("replay");
        let batch = run_analyze("tests/config.yaml", &[PathBuf::from("tests/data/specimen.csv")]).expect("analysis");
        let batch = &batch.specimens[0].properties;
        assert_eq!(replayed.sample_count, batch.sample_count);
        assert_relative_eq!(replayed.youngs_modulus, batch.youngs_modulus, max_relative = 1e-6);
        assert_relative_eq!(replayed.energy_to_break, batch.energy_to_break, max_relative = 1e-6);
        assert_eq!(replayed.break_index, batch.break_index);
    }

    #[test]
    fn test_missing_samples_file_is_an_error() {
        assert!(run_analyze("tests/config.yaml", &[PathBuf::from("tests/data/missing.csv")]).is_err());
    }
}
