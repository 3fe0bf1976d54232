//! Failure classification from the shape of the stress-strain curve.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TensileError, TensileResult};
use crate::sample::DerivedSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureType {
    Brittle,
    Ductile,
    Necking,
    /// Assigned by the operator after inspecting the specimen.
    GripFailure,
    /// Assigned by the operator when the specimen did not separate.
    NoBreak,
    #[default]
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            FailureType::Brittle => "Brittle",
            FailureType::Ductile => "Ductile",
            FailureType::Necking => "Necking/Ductile",
            FailureType::GripFailure => "Grip Failure",
            FailureType::NoBreak => "No Break",
            FailureType::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Strain thresholds for [`classify`].
///
/// The defaults are empirical rules of thumb, not values from a test standard.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FailureThresholds {
    /// Strain at break below this is brittle.
    pub brittle_max_strain: f64,
    /// Strain gained between UTS and break above this indicates necking.
    pub necking_min_post_uts_strain: f64,
    /// Strain at break above this is ductile.
    pub ductile_min_strain: f64,
}

impl Default for FailureThresholds {
    fn default() -> Self {
        FailureThresholds {
            brittle_max_strain: 0.02,
            necking_min_post_uts_strain: 0.05,
            ductile_min_strain: 0.05,
        }
    }
}

impl FailureThresholds {
    pub fn validate(&self) -> TensileResult<()> {
        for (name, value) in [
            ("brittle_max_strain", self.brittle_max_strain),
            ("necking_min_post_uts_strain", self.necking_min_post_uts_strain),
            ("ductile_min_strain", self.ductile_min_strain),
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

/// Classifies the break from strains at UTS and at the break point.
///
/// Rules, first match wins: brittle, necking, ductile, otherwise unknown.
pub fn classify_strains(strain_at_uts: f64, strain_at_break: f64, t: &FailureThresholds) -> FailureType {
    if strain_at_break < t.brittle_max_strain {
        FailureType::Brittle
    } else if strain_at_break - strain_at_uts > t.necking_min_post_uts_strain {
        FailureType::Necking
    } else if strain_at_break > t.ductile_min_strain {
        FailureType::Ductile
    } else {
        FailureType::Unknown
    }
}

/// Classifies a recorded curve given its UTS and break indices.
pub fn classify(
    samples: &[DerivedSample],
    uts_index: usize,
    break_index: usize,
    thresholds: &FailureThresholds,
) -> FailureType {
    match (samples.get(uts_index), samples.get(break_index)) {
        (Some(uts), Some(brk)) => classify_strains(uts.strain, brk.strain, thresholds),
        _ => FailureType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        let t = FailureThresholds::default();
        assert_eq!(classify_strains(0.01, 0.015, &t), FailureType::Brittle);
        assert_eq!(classify_strains(0.10, 0.20, &t), FailureType::Necking);
        assert_eq!(classify_strains(0.08, 0.10, &t), FailureType::Ductile);
        assert_eq!(classify_strains(0.03, 0.04, &t), FailureType::Unknown);
        // Brittle wins even with a large post-UTS strain difference.
        assert_eq!(classify_strains(-0.1, 0.01, &t), FailureType::Brittle);
    }

    #[test]
    fn test_thresholds_are_tunable() {
        let t = FailureThresholds {
            brittle_max_strain: 0.05,
            ..FailureThresholds::default()
        };
        assert_eq!(classify_strains(0.03, 0.04, &t), FailureType::Brittle);
    }

    #[test]
    fn test_out_of_range_index_is_unknown() {
        assert_eq!(classify(&[], 0, 3, &FailureThresholds::default()), FailureType::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(FailureType::Necking.to_string(), "Necking/Ductile");
        assert_eq!(FailureType::GripFailure.to_string(), "Grip Failure");
    }
}
