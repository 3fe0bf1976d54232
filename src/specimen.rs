//! Specimen geometry for a tensile test.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{TensileError, TensileResult};

/// Original specimen dimensions used to turn force/extension into stress/strain.
///
/// Both values are strictly positive and finite. A geometry can only be
/// obtained through [`SpecimenGeometry::new`] (or deserialization, which goes
/// through the same check), so invalid geometry is rejected before a test
/// starts rather than discovered mid-analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct SpecimenGeometry {
    gauge_length_mm: f64,
    cross_section_area_mm2: f64,
}

#[derive(Deserialize)]
struct RawGeometry {
    gauge_length_mm: f64,
    cross_section_area_mm2: f64,
}

impl TryFrom<RawGeometry> for SpecimenGeometry {
    type Error = TensileError;

    fn try_from(raw: RawGeometry) -> TensileResult<Self> {
        SpecimenGeometry::new(raw.gauge_length_mm, raw.cross_section_area_mm2)
    }
}

impl SpecimenGeometry {
    /// Validates and builds a geometry.
    ///
    /// # Errors
    ///
    /// Returns [`TensileError::InvalidGeometry`] if either dimension is not a
    /// positive finite number.
    pub fn new(gauge_length_mm: f64, cross_section_area_mm2: f64) -> TensileResult<Self> {
        if !(gauge_length_mm.is_finite() && gauge_length_mm > 0.0) {
            return Err(TensileError::InvalidGeometry(format!(
                "gauge_length_mm must be greater than 0.0, got {}",
                gauge_length_mm
            )));
        }
        if !(cross_section_area_mm2.is_finite() && cross_section_area_mm2 > 0.0) {
            return Err(TensileError::InvalidGeometry(format!(
                "cross_section_area_mm2 must be greater than 0.0, got {}",
                cross_section_area_mm2
            )));
        }
        Ok(SpecimenGeometry {
            gauge_length_mm,
            cross_section_area_mm2,
        })
    }

    pub fn gauge_length_mm(&self) -> f64 {
        self.gauge_length_mm
    }

    pub fn cross_section_area_mm2(&self) -> f64 {
        self.cross_section_area_mm2
    }
}

/// Cross-section description as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CrossSection {
    /// Area given directly, in mm².
    Area { area_mm2: f64 },
    /// Flat specimen: width × thickness.
    Rectangular { width_mm: f64, thickness_mm: f64 },
    /// Round bar: π·d²/4.
    Round { diameter_mm: f64 },
}

impl CrossSection {
    pub fn area_mm2(&self) -> f64 {
        match *self {
            CrossSection::Area { area_mm2 } => area_mm2,
            CrossSection::Rectangular {
                width_mm,
                thickness_mm,
            } => width_mm * thickness_mm,
            CrossSection::Round { diameter_mm } => PI * diameter_mm * diameter_mm / 4.0,
        }
    }
}

/// The `specimen` section of the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpecimenConfig {
    /// Optional specimen identifier, carried into log output.
    #[serde(default)]
    pub name: String,
    /// Original gauge length in mm.
    pub gauge_length_mm: f64,
    /// Cross section used to compute the original area.
    pub cross_section: CrossSection,
}

impl SpecimenConfig {
    /// Resolves the configured dimensions into a validated geometry.
    pub fn geometry(&self) -> TensileResult<SpecimenGeometry> {
        SpecimenGeometry::new(self.gauge_length_mm, self.cross_section.area_mm2())
    }

    pub fn validate(&self) -> TensileResult<()> {
        self.geometry().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_non_positive_dimensions() {
        assert!(SpecimenGeometry::new(50.0, 40.0).is_ok());
        assert!(SpecimenGeometry::new(0.0, 40.0).is_err());
        assert!(SpecimenGeometry::new(50.0, -1.0).is_err());
        assert!(SpecimenGeometry::new(f64::NAN, 40.0).is_err());
        assert!(SpecimenGeometry::new(50.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialize_goes_through_validation() {
        let ok: SpecimenGeometry =
            serde_json::from_str(r#"{"gauge_length_mm": 50.0, "cross_section_area_mm2": 40.0}"#)
                .expect("valid geometry");
        assert_eq!(ok.gauge_length_mm(), 50.0);

        let bad = serde_json::from_str::<SpecimenGeometry>(
            r#"{"gauge_length_mm": -5.0, "cross_section_area_mm2": 40.0}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_cross_section_areas() {
        let rect = CrossSection::Rectangular {
            width_mm: 10.0,
            thickness_mm: 4.0,
        };
        assert_relative_eq!(rect.area_mm2(), 40.0);
        let round = CrossSection::Round { diameter_mm: 2.0 };
        assert_relative_eq!(round.area_mm2(), PI, epsilon = 1e-12);

        let config = SpecimenConfig {
            name: String::from("dogbone"),
            gauge_length_mm: 50.0,
            cross_section: CrossSection::Round { diameter_mm: 0.0 },
        };
        assert!(config.validate().is_err());
    }
}
