//! Error types for the Insulator application

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsulatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown blood glucose unit: {0}")]
    UnknownUnit(String),

    #[error("Health data fetch failed: {0}")]
    Fetch(String),
}
