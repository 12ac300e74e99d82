//! Background fetch of the most recent blood glucose sample
//!
//! The query runs once on its own thread and reports a single message.
//! There is no retry, timeout or cancellation. The database is only ever
//! opened read-only; a missing file or table counts as no data.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::thread;

use log::{info, warn};

use crate::error::InsulatorError;
use crate::storage::{GlucoseSample, Storage};

/// Message from the fetch thread
#[derive(Debug, Clone, PartialEq)]
pub enum FetchMessage {
    Sample(GlucoseSample),
    NoData,
    Error(String),
}

impl FetchMessage {
    /// Collapse into the optional sample the calculator cares about
    pub fn into_sample(self) -> Result<Option<GlucoseSample>, InsulatorError> {
        match self {
            FetchMessage::Sample(sample) => Ok(Some(sample)),
            FetchMessage::NoData => Ok(None),
            FetchMessage::Error(e) => Err(InsulatorError::Fetch(e)),
        }
    }
}

/// Start a fetch of the newest sample in the database at `db_path`
pub fn fetch_latest<P: Into<PathBuf>>(db_path: P) -> Receiver<FetchMessage> {
    let db_path = db_path.into();
    let (tx, rx) = channel();

    thread::spawn(move || {
        info!("Querying latest blood glucose sample from {}", db_path.display());
        let message = if !db_path.exists() {
            FetchMessage::NoData
        } else {
            query_latest(&db_path)
        };
        // Receiver may already be gone; nothing to do then
        let _ = tx.send(message);
    });

    rx
}

fn query_latest(db_path: &Path) -> FetchMessage {
    match Storage::open_read_only(db_path).and_then(|s| s.latest_sample()) {
        Ok(Some(sample)) => FetchMessage::Sample(sample),
        Ok(None) => FetchMessage::NoData,
        Err(e) => {
            warn!("Blood glucose query failed: {}", e);
            FetchMessage::Error(e.to_string())
        }
    }
}

/// Start a fetch and wait for its single message
pub fn fetch_latest_blocking<P: Into<PathBuf>>(
    db_path: P,
) -> Result<Option<GlucoseSample>, InsulatorError> {
    fetch_latest(db_path)
        .recv()
        .map_err(|e| InsulatorError::Fetch(e.to_string()))?
        .into_sample()
}
