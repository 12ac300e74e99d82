//! Insulin dose calculation
//!
//! The suggested dose is the sum of a carbohydrate dose (meal carbohydrates
//! over the carbohydrate factor) and a corrective dose (distance from the
//! desired blood glucose level over the corrective factor), floored at zero.
//! The corrective term is always evaluated in mmol/L.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::InsulatorError;
use crate::units::{round_to_tenth, BloodGlucoseUnit};

/// Inputs for a single dose calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DoseInputs {
    carbohydrate_factor: f64,
    corrective_factor: f64,
    desired_blood_glucose_level: f64,
    current_blood_glucose_level: f64,
    carbohydrates_in_meal: f64,
    unit: BloodGlucoseUnit,
}

impl DoseInputs {
    /// Build validated inputs. Every value must be finite and non-negative.
    pub fn new(
        carbohydrate_factor: f64,
        corrective_factor: f64,
        desired_blood_glucose_level: f64,
        current_blood_glucose_level: f64,
        carbohydrates_in_meal: f64,
        unit: BloodGlucoseUnit,
    ) -> Result<Self, InsulatorError> {
        validate("carbohydrate factor", carbohydrate_factor)?;
        validate("corrective factor", corrective_factor)?;
        validate("desired blood glucose level", desired_blood_glucose_level)?;
        validate("current blood glucose level", current_blood_glucose_level)?;
        validate("carbohydrates in meal", carbohydrates_in_meal)?;

        Ok(Self {
            carbohydrate_factor,
            corrective_factor,
            desired_blood_glucose_level,
            current_blood_glucose_level,
            carbohydrates_in_meal,
            unit,
        })
    }

    pub fn carbohydrate_factor(&self) -> f64 {
        self.carbohydrate_factor
    }

    pub fn corrective_factor(&self) -> f64 {
        self.corrective_factor
    }

    pub fn desired_blood_glucose_level(&self) -> f64 {
        self.desired_blood_glucose_level
    }

    pub fn current_blood_glucose_level(&self) -> f64 {
        self.current_blood_glucose_level
    }

    pub fn carbohydrates_in_meal(&self) -> f64 {
        self.carbohydrates_in_meal
    }

    pub fn unit(&self) -> BloodGlucoseUnit {
        self.unit
    }
}

/// Reject negative and non-finite values
pub fn validate(name: &str, value: f64) -> Result<f64, InsulatorError> {
    if !value.is_finite() {
        return Err(InsulatorError::InvalidInput(format!(
            "{} must be a finite number, got {}",
            name, value
        )));
    }
    if value < 0.0 {
        return Err(InsulatorError::InvalidInput(format!(
            "{} must not be negative, got {}",
            name, value
        )));
    }
    Ok(value)
}

/// Result of a dose calculation, in insulin units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DoseResult {
    pub carbohydrate_dose: f64,
    /// Negative when the current level is below the desired level
    pub corrective_dose: f64,
    /// Never negative
    pub suggested_dose: f64,
}

impl DoseResult {
    /// Copy with each dose rounded to one decimal place for display
    pub fn rounded(&self) -> Self {
        Self {
            carbohydrate_dose: round_to_tenth(self.carbohydrate_dose),
            corrective_dose: round_to_tenth(self.corrective_dose),
            suggested_dose: round_to_tenth(self.suggested_dose),
        }
    }
}

impl fmt::Display for DoseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Carbohydrate dose: {:.1} U", self.carbohydrate_dose)?;
        writeln!(f, "  Corrective dose:   {:.1} U", self.corrective_dose)?;
        write!(f, "  Suggested dose:    {:.1} U", self.suggested_dose)
    }
}

/// Meal carbohydrates covered by the carbohydrate factor. Zero factor means no dose.
pub fn carbohydrate_dose(inputs: &DoseInputs) -> f64 {
    if inputs.carbohydrate_factor == 0.0 {
        return 0.0;
    }
    inputs.carbohydrates_in_meal / inputs.carbohydrate_factor
}

/// Correction towards the desired level, in mmol/L over the corrective factor.
///
/// An unset current level (zero) gives no correction. A zero corrective
/// factor also gives no correction rather than an infinite dose.
pub fn corrective_dose(inputs: &DoseInputs) -> f64 {
    if inputs.current_blood_glucose_level == 0.0 {
        return 0.0;
    }
    if inputs.corrective_factor == 0.0 {
        warn!("Corrective factor is 0, skipping corrective dose");
        return 0.0;
    }

    let current = inputs.unit.to_mmol(inputs.current_blood_glucose_level);
    let desired = inputs.unit.to_mmol(inputs.desired_blood_glucose_level);
    (current - desired) / inputs.corrective_factor
}

/// Compute all three doses
pub fn calculate(inputs: &DoseInputs) -> DoseResult {
    let carbohydrate_dose = carbohydrate_dose(inputs);
    let corrective_dose = corrective_dose(inputs);
    let suggested_dose = (carbohydrate_dose + corrective_dose).max(0.0);

    debug!(
        "Dose for {:?}: carbohydrate={} corrective={} suggested={}",
        inputs, carbohydrate_dose, corrective_dose, suggested_dose
    );

    DoseResult {
        carbohydrate_dose,
        corrective_dose,
        suggested_dose,
    }
}
