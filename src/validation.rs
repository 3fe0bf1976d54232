//! Quality gate over a computed result.

use serde::{Deserialize, Serialize};

use crate::analysis::MechanicalProperties;
use crate::error::{TensileError, TensileResult};

/// Literal note used when nothing is flagged.
pub const VALID_NOTE: &str = "Test valid";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Modulus fits below this R² are noted (but do not invalidate the test).
    pub min_r_squared: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        QualityThresholds { min_r_squared: 0.99 }
    }
}

impl QualityThresholds {
    pub fn validate(&self) -> TensileResult<()> {
        if !(0.0..=1.0).contains(&self.min_r_squared) {
            return Err(TensileError::InvalidConfig(format!(
                "min_r_squared must be between 0.0 and 1.0, got {}",
                self.min_r_squared
            )));
        }
        Ok(())
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub is_valid: bool,
    pub notes: Vec<String>,
}

impl Assessment {
    /// Notes joined by `"; "`, or [`VALID_NOTE`].
    pub fn summary(&self) -> String {
        if self.notes.is_empty() {
            VALID_NOTE.to_string()
        } else {
            self.notes.join("; ")
        }
    }
}

/// Checks fit quality and physical plausibility.
///
/// Only a missing modulus makes the test invalid; the other findings are notes.
/// True values outside their strain range are reported through
/// [`MechanicalProperties::true_values_valid`], not here.
pub fn assess(props: &MechanicalProperties, thresholds: &QualityThresholds) -> Assessment {
    let mut notes = Vec::new();
    let mut is_valid = true;

    if props.modulus_r_squared < thresholds.min_r_squared {
        notes.push(format!(
            "Modulus fit R²={:.3} (ideal > {})",
            props.modulus_r_squared, thresholds.min_r_squared
        ));
    }
    if props.youngs_modulus <= 0.0 {
        notes.push("Could not determine Young's modulus".to_string());
        is_valid = false;
    }
    if props.yield_strength <= 0.0 {
        notes.push("Could not determine yield strength".to_string());
    }
    if props.ultimate_tensile_strength < props.yield_strength {
        notes.push("UTS less than yield strength (unusual)".to_string());
    }
    if props.elongation_at_break <= 0.0 {
        notes.push("No elongation at break recorded".to_string());
    }

    Assessment { is_valid, notes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good() -> MechanicalProperties {
        MechanicalProperties {
            ultimate_tensile_strength: 300.0,
            yield_strength: 250.0,
            youngs_modulus: 200_000.0,
            modulus_r_squared: 0.999,
            elongation_at_break: 20.0,
            true_values_valid: true,
            ..MechanicalProperties::default()
        }
    }

    #[test]
    fn test_clean_result() {
        let a = assess(&good(), &QualityThresholds::default());
        assert!(a.is_valid);
        assert_eq!(a.summary(), "Test valid");
    }

    #[test]
    fn test_missing_modulus_invalidates() {
        let props = MechanicalProperties {
            youngs_modulus: 0.0,
            modulus_r_squared: 0.0,
            yield_strength: 0.0,
            ..good()
        };
        let a = assess(&props, &QualityThresholds::default());
        assert!(!a.is_valid);
        assert_eq!(
            a.summary(),
            "Modulus fit R²=0.000 (ideal > 0.99); Could not determine Young's modulus; \
             Could not determine yield strength"
        );
    }

    #[test]
    fn test_uts_below_yield_is_only_flagged() {
        let props = MechanicalProperties {
            ultimate_tensile_strength: 200.0,
            ..good()
        };
        let a = assess(&props, &QualityThresholds::default());
        assert!(a.is_valid);
        assert_eq!(a.notes, vec!["UTS less than yield strength (unusual)".to_string()]);
    }

    #[test]
    fn test_out_of_range_true_values_leave_notes_clean() {
        let props = MechanicalProperties {
            strain_at_uts: 0.6,
            true_values_valid: false,
            ..good()
        };
        let a = assess(&props, &QualityThresholds::default());
        assert!(a.is_valid);
        assert_eq!(a.summary(), VALID_NOTE);
    }

    #[test]
    fn test_no_elongation() {
        let props = MechanicalProperties {
            elongation_at_break: 0.0,
            ..good()
        };
        let a = assess(&props, &QualityThresholds::default());
        assert!(a.summary().contains("No elongation at break recorded"));
    }
}
