//! History Store Contract
//!
//! The analytical engines never touch a database directly: they receive an
//! `Arc<dyn HistoryStore>` and treat it as a read/write oracle for readings,
//! alerts, predictions, and maintenance records. Two implementations:
//!
//! - [`SledHistoryStore`]: embedded sled database (production)
//! - [`MemoryStore`]: lock-guarded vectors (tests, demos)
//!
//! Store failures always surface as [`StorageError`] — the engines must never
//! collapse an unavailable store into a false "no anomalies" or "zero
//! probability" result.

pub mod history;
pub mod memory;

pub use history::SledHistoryStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{
    Alert, AnomalyEvent, FailurePrediction, MaintenanceRecord, MaintenanceStatus, MaintenanceType,
    SensorReading,
};

/// Error type for store operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("maintenance record {0} not found")]
    MaintenanceNotFound(u64),

    #[error("invalid maintenance status transition: {from} -> {to}")]
    InvalidTransition {
        from: MaintenanceStatus,
        to: MaintenanceStatus,
    },
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Read/write contract the analytical core requires from the persistence
/// layer. Calls are synchronous and blocking; computations bounded by window
/// sizes run to completion between calls.
pub trait HistoryStore: Send + Sync {
    /// Persist one reading. Readings are immutable once recorded.
    fn insert_reading(&self, reading: &SensorReading) -> Result<(), StorageError>;

    /// Most recent `limit` readings for a sensor, newest first.
    fn recent_readings(
        &self,
        sensor_name: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError>;

    /// Readings with `start <= timestamp <= end` for a sensor, oldest first.
    fn readings_in_range(
        &self,
        sensor_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, StorageError>;

    /// Persist an anomaly event as an active alert. Returns the alert id.
    fn create_alert(&self, event: &AnomalyEvent) -> Result<u64, StorageError>;

    /// Most recent `limit` alerts across all sensors, newest first.
    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError>;

    /// Append a prediction to the log. Predictions are never overwritten;
    /// later runs supersede earlier ones by `created_at`.
    fn save_prediction(&self, prediction: &FailurePrediction) -> Result<(), StorageError>;

    /// Latest prediction per sensor, derived by max `created_at`.
    fn latest_predictions(&self) -> Result<Vec<FailurePrediction>, StorageError>;

    /// All maintenance records, optionally filtered by status.
    fn maintenance_records(
        &self,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceRecord>, StorageError>;

    /// Create a planned maintenance record. Returns the record id.
    fn create_maintenance_record(
        &self,
        sensor_name: &str,
        maintenance_type: MaintenanceType,
        description: &str,
        scheduled_date: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Advance a maintenance record's status. Rejects non-monotonic
    /// transitions (see [`MaintenanceStatus::can_transition_to`]).
    fn update_maintenance_status(
        &self,
        id: u64,
        status: MaintenanceStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError>;
}
