//! A module for loading and validating the configuration of a tensile test.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::analysis::AnalysisConfig;
use crate::error::TensileResult;
use crate::live::LiveConfig;
use crate::session::TestSession;
use crate::specimen::SpecimenConfig;

/// Represents the configuration for one test (or a series of identical specimens).
///
/// Only `specimen` is required; `analysis` and `live` fall back to the
/// standard thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub specimen: SpecimenConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

impl Config {
    /// Validates the entire configuration.
    ///
    /// Geometry problems are reported here so that a test with an invalid
    /// specimen can never be started.
    pub fn validate(&self) -> TensileResult<()> {
        self.specimen.validate()?;
        self.analysis.validate()?;
        self.live.validate()?;
        Ok(())
    }

    /// Validates the configuration and starts a fresh test with it.
    pub fn start_session(&self) -> TensileResult<TestSession> {
        self.validate()?;
        Ok(TestSession::new(
            self.specimen.geometry()?,
            self.analysis.clone(),
            self.live.clone(),
        ))
    }
}

/// Loads the configuration from a YAML file, or TOML when the extension is `.toml`.
///
/// # Arguments
///
/// * `config_path` - A path reference to the configuration file.
///
/// # Errors
///
/// This function will return an error if reading or parsing the configuration file fails.
/// The result is not validated; call [`Config::validate`].
pub fn load_config<P: AsRef<Path>>(config_path: P) -> TensileResult<Config> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
    let config: Config = if is_toml {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specimen::CrossSection;
    use approx::assert_relative_eq;

    #[test]
    fn test_load_config() {
        let config_path = "tests/config.yaml";
        let config = load_config(config_path).expect("Failed to load config");
        assert!(config.validate().is_ok(), "Expected Ok(()) but got Err with {:?}", config.validate());
        assert_eq!(config.specimen.name, "ISO 527 type 1A");
        assert_relative_eq!(config.specimen.geometry().unwrap().cross_section_area_mm2(), 40.0);
        // Unspecified fields keep their defaults.
        assert_eq!(config.analysis.min_samples, 10);
        assert_relative_eq!(config.analysis.fallback_modulus_window.end, 0.01);
        assert_relative_eq!(config.analysis.failure.ductile_min_strain, 0.05);
        assert_eq!(config.live.plateau_window, 20);
    }

    #[test]
    fn test_load_toml_config() {
        let config = load_config("tests/config.toml").expect("Failed to load config");
        assert!(config.validate().is_ok());
        assert_eq!(config.specimen.cross_section, CrossSection::Round { diameter_mm: 5.0 });
        assert_relative_eq!(config.analysis.quality.min_r_squared, 0.98);
        assert_relative_eq!(config.analysis.break_drop_fraction, 0.5);
    }

    #[test]
    fn test_invalid_geometry_blocks_start() {
        let yaml = "specimen:\n  gauge_length_mm: 0.0\n  cross_section:\n    shape: area\n    area_mm2: 40.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
        assert!(config.start_session().is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config("tests/does_not_exist.yaml").is_err());
    }
}
