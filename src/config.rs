//! Preferences file parsing and data paths

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::calculator::{validate, DoseInputs};
use crate::error::InsulatorError;
use crate::units::BloodGlucoseUnit;

const DEFAULT_PREFERENCES: &str = "\
# Insulator preferences
# One \"key value\" pair per line. Lines starting with # are ignored.

# Grams of carbohydrate covered by one unit of insulin
carbohydrate_factor 0

# Blood glucose drop per unit of insulin (always in mmol/L)
corrective_factor 0

# Target blood glucose level, in the unit below
desired_blood_glucose_level 0

# mmol or mgdl
blood_glucose_units_preference mmol

# Optional path to the readings database
# database_path /path/to/insulator.db
";

/// User preferences loaded from insulator.txt
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub carbohydrate_factor: f64,
    pub corrective_factor: f64,
    pub desired_blood_glucose_level: f64,
    pub blood_glucose_unit: BloodGlucoseUnit,
    pub database_path: Option<String>,
}

impl Preferences {
    /// Load preferences from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InsulatorError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse preferences from any line-oriented source
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, InsulatorError> {
        let mut prefs = Preferences::default();

        for line in reader.lines() {
            let line = line?;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, rest)) = Self::parse_line(line) {
                let value = strip_comment(rest);
                if value.is_empty() {
                    warn!("Ignoring preference '{}' with no value", key);
                    continue;
                }
                prefs.apply(key, value)?;
            } else {
                warn!("Ignoring malformed preferences line: {}", line);
            }
        }

        Ok(prefs)
    }

    /// Parse a single line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), InsulatorError> {
        match key {
            "carbohydrate_factor" => self.carbohydrate_factor = parse_number(key, value)?,
            "corrective_factor" => self.corrective_factor = parse_number(key, value)?,
            "desired_blood_glucose_level" => {
                self.desired_blood_glucose_level = parse_number(key, value)?
            }
            "blood_glucose_units_preference" => {
                self.blood_glucose_unit = value.parse().map_err(|_| {
                    InsulatorError::Config(format!("{}: unknown unit '{}'", key, value))
                })?
            }
            "database_path" => self.database_path = Some(value.to_string()),
            _ => warn!("Ignoring unknown preference '{}'", key),
        }
        Ok(())
    }

    /// Write a commented default preferences file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), InsulatorError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        file.write_all(DEFAULT_PREFERENCES.as_bytes())?;
        info!("Created default preferences at {}", path.display());
        Ok(())
    }

    /// True until the user has set both factors
    pub fn is_unconfigured(&self) -> bool {
        self.carbohydrate_factor == 0.0 && self.corrective_factor == 0.0
    }

    /// Build validated calculator inputs from these preferences
    pub fn dose_inputs(
        &self,
        current_blood_glucose_level: f64,
        carbohydrates_in_meal: f64,
    ) -> Result<DoseInputs, InsulatorError> {
        DoseInputs::new(
            self.carbohydrate_factor,
            self.corrective_factor,
            self.desired_blood_glucose_level,
            current_blood_glucose_level,
            carbohydrates_in_meal,
            self.blood_glucose_unit,
        )
    }
}

/// Cut a trailing comment. `#` only starts a comment after whitespace,
/// so values such as paths may contain it.
fn strip_comment(value: &str) -> &str {
    let mut after_space = true;
    for (i, c) in value.char_indices() {
        if c == '#' && after_space {
            return value[..i].trim();
        }
        after_space = c.is_whitespace();
    }
    value.trim()
}

fn parse_number(key: &str, value: &str) -> Result<f64, InsulatorError> {
    let number: f64 = value
        .parse()
        .map_err(|_| InsulatorError::Config(format!("{}: '{}' is not a number", key, value)))?;
    validate(key, number)
}

/// Get the application data directory
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("insulator")
}

/// Ensure the data directory exists
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Default location of the preferences file
pub fn config_file_path() -> PathBuf {
    get_data_dir().join("insulator.txt")
}

/// Default location of the readings database
pub fn default_database_path() -> PathBuf {
    get_data_dir().join("insulator.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_preferences() {
        let text = "\
# comment line
carbohydrate_factor 10
corrective_factor   2   # per unit
desired_blood_glucose_level 108

blood_glucose_units_preference mgdl
database_path /tmp/readings.db
";
        let prefs = Preferences::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(prefs.carbohydrate_factor, 10.0);
        assert_eq!(prefs.corrective_factor, 2.0);
        assert_eq!(prefs.desired_blood_glucose_level, 108.0);
        assert_eq!(prefs.blood_glucose_unit, BloodGlucoseUnit::MgDl);
        assert_eq!(prefs.database_path.as_deref(), Some("/tmp/readings.db"));
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let text = "theme dark\ncarbohydrate_factor 12\n";
        let prefs = Preferences::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(prefs.carbohydrate_factor, 12.0);
    }

    #[test]
    fn test_hash_inside_value_is_kept() {
        let text = "\
database_path /data/run#2/insulator.db   # moved after upgrade
corrective_factor #unset
";
        let prefs = Preferences::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(prefs.database_path.as_deref(), Some("/data/run#2/insulator.db"));
        assert_eq!(prefs.corrective_factor, 0.0);
        assert!(Preferences::from_reader(Cursor::new("carbohydrate_factor 10#\n")).is_err());
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("2   # per unit"), "2");
        assert_eq!(strip_comment("a#b"), "a#b");
        assert_eq!(strip_comment("a\t#b"), "a");
        assert_eq!(strip_comment("#only"), "");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(matches!(
            Preferences::from_reader(Cursor::new("corrective_factor two\n")),
            Err(InsulatorError::Config(_))
        ));
        assert!(matches!(
            Preferences::from_reader(Cursor::new("blood_glucose_units_preference grains\n")),
            Err(InsulatorError::Config(_))
        ));
        assert!(matches!(
            Preferences::from_reader(Cursor::new("carbohydrate_factor -3\n")),
            Err(InsulatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_default_file_round_trip() {
        let path = std::env::temp_dir().join(format!("insulator-prefs-{}.txt", std::process::id()));
        Preferences::create_default(&path).unwrap();
        let prefs = Preferences::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(prefs, Preferences::default());
        assert!(prefs.is_unconfigured());
    }

    #[test]
    fn test_dose_inputs_use_preferences() {
        let prefs = Preferences {
            carbohydrate_factor: 10.0,
            corrective_factor: 2.0,
            desired_blood_glucose_level: 6.0,
            blood_glucose_unit: BloodGlucoseUnit::Mmol,
            database_path: None,
        };
        let inputs = prefs.dose_inputs(10.0, 50.0).unwrap();
        assert_eq!(inputs.carbohydrate_factor(), 10.0);
        assert_eq!(inputs.desired_blood_glucose_level(), 6.0);
        assert_eq!(inputs.current_blood_glucose_level(), 10.0);
        assert_eq!(inputs.unit(), BloodGlucoseUnit::Mmol);
        assert!(prefs.dose_inputs(-1.0, 50.0).is_err());
    }
}
