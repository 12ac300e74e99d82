//! Insulin dose estimation from meal carbohydrates and blood glucose
//!
//! The calculator is a pure function of the user's preferences and two
//! per-meal values. Blood glucose readings can be entered in mmol/L or
//! mg/dL, or taken from a local readings database.

pub mod calculator;
pub mod config;
pub mod error;
pub mod health;
pub mod session;
pub mod storage;
pub mod units;

pub use calculator::{calculate, DoseInputs, DoseResult};
pub use config::Preferences;
pub use error::InsulatorError;
pub use units::BloodGlucoseUnit;
