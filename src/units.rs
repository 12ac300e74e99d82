//! Blood glucose unit types, conversion and formatting
//!
//! Doses are always computed in mmol/L. Values entered in mg/dL are divided
//! by [`MGDL_PER_MMOL`] before the corrective term is evaluated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InsulatorError;

/// Fixed ratio between mg/dL and mmol/L for blood glucose
pub const MGDL_PER_MMOL: f64 = 18.0;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.0} mg/dL", self.0)
    }

    /// Get the unit label
    pub fn unit_label() -> &'static str {
        "mg/dL"
    }

    pub fn to_mmol(self) -> MmolL {
        MmolL(self.0 / MGDL_PER_MMOL)
    }
}

impl MmolL {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.1} mmol/L", self.0)
    }

    /// Get the unit label
    pub fn unit_label() -> &'static str {
        "mmol/L"
    }

    pub fn to_mg_dl(self) -> MgDl {
        MgDl(self.0 * MGDL_PER_MMOL)
    }
}

/// User's preferred blood glucose unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BloodGlucoseUnit {
    #[serde(rename = "mmol")]
    #[default]
    Mmol,
    #[serde(rename = "mgdl")]
    MgDl,
}

impl BloodGlucoseUnit {
    /// Preference value as written in the preferences file
    pub fn as_str(self) -> &'static str {
        match self {
            BloodGlucoseUnit::Mmol => "mmol",
            BloodGlucoseUnit::MgDl => "mgdl",
        }
    }

    /// Convert a value expressed in this unit to mmol/L
    pub fn to_mmol(self, value: f64) -> f64 {
        match self {
            BloodGlucoseUnit::Mmol => value,
            BloodGlucoseUnit::MgDl => MgDl(value).to_mmol().0,
        }
    }

    /// Convert a mmol/L value back into this unit
    pub fn from_mmol(self, value: f64) -> f64 {
        match self {
            BloodGlucoseUnit::Mmol => value,
            BloodGlucoseUnit::MgDl => MmolL(value).to_mg_dl().0,
        }
    }

    /// Format a value in this unit with unit suffix
    pub fn format(self, value: f64) -> String {
        match self {
            BloodGlucoseUnit::Mmol => MmolL(value).format(),
            BloodGlucoseUnit::MgDl => MgDl(value).format(),
        }
    }

    /// Get the unit label, also used as the input placeholder
    pub fn label(self) -> &'static str {
        match self {
            BloodGlucoseUnit::Mmol => MmolL::unit_label(),
            BloodGlucoseUnit::MgDl => MgDl::unit_label(),
        }
    }
}

impl FromStr for BloodGlucoseUnit {
    type Err = InsulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mmol" | "mmol/l" => Ok(BloodGlucoseUnit::Mmol),
            "mgdl" | "mg/dl" => Ok(BloodGlucoseUnit::MgDl),
            _ => Err(InsulatorError::UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for BloodGlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to one decimal place, the precision shown for doses and readings
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mmol_is_unchanged() {
        assert_eq!(BloodGlucoseUnit::Mmol.to_mmol(6.5), 6.5);
        assert_eq!(BloodGlucoseUnit::Mmol.from_mmol(6.5), 6.5);
    }

    #[test]
    fn test_mgdl_divides_by_18() {
        assert!((BloodGlucoseUnit::MgDl.to_mmol(108.0) - 6.0).abs() < 1e-9);
        assert!((BloodGlucoseUnit::MgDl.to_mmol(180.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_mgdl_round_trip() {
        for value in [0.0, 1.0, 54.0, 99.9, 180.0, 437.5] {
            let unit = BloodGlucoseUnit::MgDl;
            let back = unit.from_mmol(unit.to_mmol(value));
            assert!((back - value).abs() < 1e-9, "{} -> {}", value, back);
        }
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("mmol".parse::<BloodGlucoseUnit>().unwrap(), BloodGlucoseUnit::Mmol);
        assert_eq!("mgdl".parse::<BloodGlucoseUnit>().unwrap(), BloodGlucoseUnit::MgDl);
        assert_eq!(" mg/dL ".parse::<BloodGlucoseUnit>().unwrap(), BloodGlucoseUnit::MgDl);
        assert!(matches!(
            "grains".parse::<BloodGlucoseUnit>(),
            Err(InsulatorError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_default_unit_is_mmol() {
        assert_eq!(BloodGlucoseUnit::default(), BloodGlucoseUnit::Mmol);
    }

    #[test]
    fn test_formatting() {
        assert_eq!(BloodGlucoseUnit::Mmol.format(10.0), "10.0 mmol/L");
        assert_eq!(BloodGlucoseUnit::MgDl.format(180.0), "180 mg/dL");
        assert_eq!(BloodGlucoseUnit::MgDl.format(107.6), "108 mg/dL");
        assert_eq!(BloodGlucoseUnit::MgDl.label(), "mg/dL");
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(5.55555), 5.6);
        assert_eq!(round_to_tenth(7.04), 7.0);
        assert_eq!(round_to_tenth(0.0), 0.0);
    }
}
