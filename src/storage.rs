//! SQLite storage for blood glucose samples
//!
//! The `readings` table uses the same layout as meter download databases
//! (epoch, timestamp, mg/dL and mmol/L columns), so an existing database can
//! be pointed at directly.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::InsulatorError;
use crate::units::{round_to_tenth, BloodGlucoseUnit, MgDl};

/// A single blood glucose sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSample {
    pub epoch: i64,
    pub timestamp: String,
    #[serde(rename = "mg/dL")]
    pub mg_dl: f64,
    #[serde(rename = "mmol/L")]
    pub mmol_l: f64,
}

impl GlucoseSample {
    /// Build a sample from a mg/dL reading taken at `epoch` (UTC seconds)
    pub fn from_mg_dl(epoch: i64, mg_dl: f64) -> std::result::Result<Self, InsulatorError> {
        let taken_at = DateTime::<Utc>::from_timestamp(epoch, 0).ok_or_else(|| {
            InsulatorError::InvalidInput(format!("epoch {} is out of range", epoch))
        })?;
        Ok(Self {
            epoch,
            timestamp: taken_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            mg_dl,
            mmol_l: MgDl(mg_dl).to_mmol().0,
        })
    }

    /// Reading in the user's unit, rounded to one decimal
    pub fn value_in(&self, unit: BloodGlucoseUnit) -> f64 {
        match unit {
            BloodGlucoseUnit::Mmol => round_to_tenth(self.mmol_l),
            BloodGlucoseUnit::MgDl => round_to_tenth(self.mg_dl),
        }
    }
}

/// SQLite database for storing samples
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create or open a database at the given path (":memory:" for a scratch db)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY,
                epoch INTEGER NOT NULL UNIQUE,
                timestamp TEXT NOT NULL,
                mg_dl REAL NOT NULL,
                mmol_l REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_readings_epoch
                ON readings(epoch);",
        )?;

        Ok(Self { conn })
    }

    /// Open an existing database without creating or altering anything
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Insert a sample, ignoring duplicates based on epoch timestamp
    pub fn insert_sample(&self, sample: &GlucoseSample) -> Result<Option<i64>> {
        let result = self.conn.execute(
            "INSERT OR IGNORE INTO readings (epoch, timestamp, mg_dl, mmol_l)
             VALUES (?1, ?2, ?3, ?4)",
            params![sample.epoch, sample.timestamp, sample.mg_dl, sample.mmol_l],
        )?;

        if result > 0 {
            Ok(Some(self.conn.last_insert_rowid()))
        } else {
            Ok(None)
        }
    }

    /// Whether the `readings` table exists yet
    pub fn has_readings(&self) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'readings'",
                [],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
    }

    /// Most recent sample by epoch, if any
    pub fn latest_sample(&self) -> Result<Option<GlucoseSample>> {
        if !self.has_readings()? {
            return Ok(None);
        }
        self.conn
            .query_row(
                "SELECT epoch, timestamp, mg_dl, mmol_l
                 FROM readings ORDER BY epoch DESC LIMIT 1",
                [],
                |row| {
                    Ok(GlucoseSample {
                        epoch: row.get(0)?,
                        timestamp: row.get(1)?,
                        mg_dl: row.get(2)?,
                        mmol_l: row.get(3)?,
                    })
                },
            )
            .optional()
    }

    /// Get total sample count
    pub fn count(&self) -> Result<i64> {
        self.conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))
    }
}
