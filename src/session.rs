//! Calculator screen state
//!
//! Holds the two user-entered fields, recomputes the doses whenever one of
//! them changes, and accepts readings coming back from the health store.

use log::debug;

use crate::calculator::{calculate, validate, DoseResult};
use crate::config::Preferences;
use crate::error::InsulatorError;

/// Parse a text field. Empty text means the value is unset (zero).
pub fn parse_field(name: &str, text: &str) -> Result<f64, InsulatorError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = text.parse().map_err(|_| {
        InsulatorError::InvalidInput(format!("{}: '{}' is not a number", name, text))
    })?;
    validate(name, value)
}

fn evaluate(
    preferences: &Preferences,
    current_blood_glucose_level: f64,
    carbohydrates_in_meal: f64,
) -> Result<DoseResult, InsulatorError> {
    let inputs = preferences.dose_inputs(current_blood_glucose_level, carbohydrates_in_meal)?;
    Ok(calculate(&inputs))
}

/// State only changes when the new values produce a dose
#[derive(Debug, Clone)]
pub struct DoseSession {
    preferences: Preferences,
    current_blood_glucose_level: f64,
    carbohydrates_in_meal: f64,
    result: DoseResult,
}

impl DoseSession {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            preferences,
            current_blood_glucose_level: 0.0,
            carbohydrates_in_meal: 0.0,
            result: DoseResult::default(),
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Swap in reloaded preferences and recompute
    pub fn set_preferences(
        &mut self,
        preferences: Preferences,
    ) -> Result<&DoseResult, InsulatorError> {
        self.result = evaluate(
            &preferences,
            self.current_blood_glucose_level,
            self.carbohydrates_in_meal,
        )?;
        self.preferences = preferences;
        Ok(&self.result)
    }

    pub fn current_blood_glucose_level(&self) -> f64 {
        self.current_blood_glucose_level
    }

    pub fn carbohydrates_in_meal(&self) -> f64 {
        self.carbohydrates_in_meal
    }

    /// Last computed doses
    pub fn result(&self) -> &DoseResult {
        &self.result
    }

    /// Placeholder for the current level field
    pub fn placeholder(&self) -> &'static str {
        self.preferences.blood_glucose_unit.label()
    }

    pub fn set_current_blood_glucose(&mut self, text: &str) -> Result<&DoseResult, InsulatorError> {
        let current = parse_field("current blood glucose level", text)?;
        self.update(current, self.carbohydrates_in_meal)
    }

    pub fn set_carbohydrates_in_meal(&mut self, text: &str) -> Result<&DoseResult, InsulatorError> {
        let carbs = parse_field("carbohydrates in meal", text)?;
        self.update(self.current_blood_glucose_level, carbs)
    }

    /// Apply a reading from the health store. `None` leaves everything as is.
    pub fn apply_sample(&mut self, value: Option<f64>) -> Result<&DoseResult, InsulatorError> {
        match value {
            Some(value) => {
                debug!("Applying health reading {}", value);
                let current = validate("current blood glucose level", value)?;
                self.update(current, self.carbohydrates_in_meal)
            }
            None => {
                debug!("No health reading available, keeping current state");
                Ok(&self.result)
            }
        }
    }

    /// Reset both fields and all doses
    pub fn clear(&mut self) {
        self.current_blood_glucose_level = 0.0;
        self.carbohydrates_in_meal = 0.0;
        self.result = DoseResult::default();
    }

    pub fn recalculate(&mut self) -> Result<&DoseResult, InsulatorError> {
        self.update(self.current_blood_glucose_level, self.carbohydrates_in_meal)
    }

    fn update(
        &mut self,
        current_blood_glucose_level: f64,
        carbohydrates_in_meal: f64,
    ) -> Result<&DoseResult, InsulatorError> {
        self.result = evaluate(
            &self.preferences,
            current_blood_glucose_level,
            carbohydrates_in_meal,
        )?;
        self.current_blood_glucose_level = current_blood_glucose_level;
        self.carbohydrates_in_meal = carbohydrates_in_meal;
        Ok(&self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::BloodGlucoseUnit;

    fn preferences() -> Preferences {
        Preferences {
            carbohydrate_factor: 10.0,
            corrective_factor: 2.0,
            desired_blood_glucose_level: 6.0,
            blood_glucose_unit: BloodGlucoseUnit::Mmol,
            database_path: None,
        }
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field("x", "").unwrap(), 0.0);
        assert_eq!(parse_field("x", "  ").unwrap(), 0.0);
        assert_eq!(parse_field("x", " 7.5 ").unwrap(), 7.5);
        assert!(parse_field("x", "abc").is_err());
        assert!(parse_field("x", "-2").is_err());
        assert!(parse_field("x", "NaN").is_err());
    }

    #[test]
    fn test_fields_recalculate() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();
        assert_eq!(session.result().suggested_dose, 5.0);

        session.set_current_blood_glucose("10").unwrap();
        assert_eq!(session.result().corrective_dose, 2.0);
        assert_eq!(session.result().suggested_dose, 7.0);
    }

    #[test]
    fn test_invalid_field_keeps_previous_result() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();
        assert!(session.set_current_blood_glucose("ten").is_err());
        assert_eq!(session.current_blood_glucose_level(), 0.0);
        assert_eq!(session.result().suggested_dose, 5.0);
    }

    #[test]
    fn test_apply_sample() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();
        session.apply_sample(Some(4.0)).unwrap();
        assert_eq!(session.current_blood_glucose_level(), 4.0);
        assert_eq!(session.result().corrective_dose, -1.0);
        assert_eq!(session.result().suggested_dose, 4.0);
    }

    #[test]
    fn test_absent_sample_leaves_state_untouched() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();
        session.set_current_blood_glucose("10").unwrap();
        let before = *session.result();

        session.apply_sample(None).unwrap();
        assert_eq!(session.current_blood_glucose_level(), 10.0);
        assert_eq!(*session.result(), before);
    }

    #[test]
    fn test_clear() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();
        session.set_current_blood_glucose("10").unwrap();
        session.clear();

        assert_eq!(session.current_blood_glucose_level(), 0.0);
        assert_eq!(session.carbohydrates_in_meal(), 0.0);
        assert_eq!(*session.result(), DoseResult::default());
    }

    #[test]
    fn test_unit_change_updates_placeholder() {
        let mut session = DoseSession::new(preferences());
        assert_eq!(session.placeholder(), "mmol/L");

        let mut prefs = preferences();
        prefs.blood_glucose_unit = BloodGlucoseUnit::MgDl;
        prefs.desired_blood_glucose_level = 108.0;
        session.set_preferences(prefs).unwrap();
        assert_eq!(session.placeholder(), "mg/dL");

        session.set_current_blood_glucose("180").unwrap();
        assert!((session.result().corrective_dose - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejected_preferences_leave_state_untouched() {
        let mut bad = preferences();
        bad.carbohydrate_factor = -1.0;

        let mut session = DoseSession::new(bad);
        assert!(session.set_current_blood_glucose("10").is_err());
        assert!(session.set_carbohydrates_in_meal("50").is_err());
        assert!(session.apply_sample(Some(8.0)).is_err());
        assert_eq!(session.current_blood_glucose_level(), 0.0);
        assert_eq!(session.carbohydrates_in_meal(), 0.0);
        assert_eq!(*session.result(), DoseResult::default());
    }

    #[test]
    fn test_rejected_preference_swap_keeps_old_preferences() {
        let mut session = DoseSession::new(preferences());
        session.set_carbohydrates_in_meal("50").unwrap();

        let mut bad = preferences();
        bad.corrective_factor = f64::NAN;
        assert!(session.set_preferences(bad).is_err());
        assert_eq!(*session.preferences(), preferences());
        assert_eq!(session.result().suggested_dose, 5.0);
    }
}
