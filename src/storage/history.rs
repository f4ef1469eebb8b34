//! Sled-backed History Store
//!
//! Persists readings, alerts, predictions, and maintenance records in
//! separate sled trees. Reading keys embed the sensor name and a big-endian
//! millisecond timestamp so per-sensor scans are naturally chronological.
//!
//! Note: writes do not flush individually. Sled provides durability via
//! background flushing; on crash at most the last few writes may be lost,
//! which this monitoring workload tolerates.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use super::{HistoryStore, StorageError};
use crate::types::{
    Alert, AnomalyEvent, FailurePrediction, MaintenanceRecord, MaintenanceStatus, MaintenanceType,
    SensorReading,
};

const READINGS_TREE: &str = "readings";
const ALERTS_TREE: &str = "alerts";
const PREDICTIONS_TREE: &str = "predictions";
const MAINTENANCE_TREE: &str = "maintenance";

/// Embedded history store over a local sled database.
#[derive(Clone)]
pub struct SledHistoryStore {
    db: Arc<sled::Db>,
    readings: sled::Tree,
    alerts: sled::Tree,
    predictions: sled::Tree,
    maintenance: sled::Tree,
}

/// Key for one reading: `sensor_name \0 timestamp_millis_be`.
///
/// The NUL separator keeps prefixes unambiguous (sensor names never contain
/// NUL), and big-endian millis sort chronologically within a sensor.
fn reading_key(sensor_name: &str, timestamp: DateTime<Utc>) -> Vec<u8> {
    let mut key = Vec::with_capacity(sensor_name.len() + 9);
    key.extend_from_slice(sensor_name.as_bytes());
    key.push(0);
    let millis = u64::try_from(timestamp.timestamp_millis()).unwrap_or(0);
    key.extend_from_slice(&millis.to_be_bytes());
    key
}

fn sensor_prefix(sensor_name: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(sensor_name.len() + 1);
    prefix.extend_from_slice(sensor_name.as_bytes());
    prefix.push(0);
    prefix
}

impl SledHistoryStore {
    /// Open or create the store at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        let readings = db.open_tree(READINGS_TREE)?;
        let alerts = db.open_tree(ALERTS_TREE)?;
        let predictions = db.open_tree(PREDICTIONS_TREE)?;
        let maintenance = db.open_tree(MAINTENANCE_TREE)?;
        Ok(Self {
            db: Arc::new(db),
            readings,
            alerts,
            predictions,
            maintenance,
        })
    }

    fn next_id(&self) -> Result<u64, StorageError> {
        Ok(self.db.generate_id()?)
    }

    /// Deserialize a stored value, skipping corrupt entries with a warning
    /// instead of failing the whole scan.
    fn decode<T: serde::de::DeserializeOwned>(tree: &str, value: &[u8]) -> Option<T> {
        match serde_json::from_slice(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(tree, error = %e, "Skipping corrupt record");
                None
            }
        }
    }

    /// Total number of stored readings across all sensors.
    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    /// Flush all trees to disk. Called on shutdown.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl HistoryStore for SledHistoryStore {
    fn insert_reading(&self, reading: &SensorReading) -> Result<(), StorageError> {
        let key = reading_key(&reading.sensor_name, reading.timestamp);
        let value = serde_json::to_vec(reading)?;
        self.readings.insert(key, value)?;
        Ok(())
    }

    fn recent_readings(
        &self,
        sensor_name: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let mut out = Vec::with_capacity(limit.min(1024));
        for item in self.readings.scan_prefix(sensor_prefix(sensor_name)).rev() {
            if out.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            if let Some(reading) = Self::decode::<SensorReading>(READINGS_TREE, &value) {
                out.push(reading);
            }
        }
        Ok(out)
    }

    fn readings_in_range(
        &self,
        sensor_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let start_key = reading_key(sensor_name, start);
        let end_key = reading_key(sensor_name, end);
        let mut out = Vec::new();
        for item in self.readings.range(start_key..=end_key) {
            let (_key, value) = item?;
            if let Some(reading) = Self::decode::<SensorReading>(READINGS_TREE, &value) {
                out.push(reading);
            }
        }
        Ok(out)
    }

    fn create_alert(&self, event: &AnomalyEvent) -> Result<u64, StorageError> {
        let id = self.next_id()?;
        let alert = Alert {
            id,
            sensor_name: event.sensor_name.clone(),
            alert_type: event.kind.label().to_string(),
            message: event.message.clone(),
            severity: event.severity,
            created_at: Utc::now(),
            is_active: true,
        };
        let value = serde_json::to_vec(&alert)?;
        self.alerts.insert(id.to_be_bytes(), value)?;
        Ok(id)
    }

    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let mut out = Vec::with_capacity(limit.min(1024));
        for item in self.alerts.iter().rev() {
            if out.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            if let Some(alert) = Self::decode::<Alert>(ALERTS_TREE, &value) {
                out.push(alert);
            }
        }
        Ok(out)
    }

    fn save_prediction(&self, prediction: &FailurePrediction) -> Result<(), StorageError> {
        let id = self.next_id()?;
        let value = serde_json::to_vec(prediction)?;
        self.predictions.insert(id.to_be_bytes(), value)?;
        Ok(())
    }

    fn latest_predictions(&self) -> Result<Vec<FailurePrediction>, StorageError> {
        let mut latest: std::collections::BTreeMap<String, FailurePrediction> =
            std::collections::BTreeMap::new();
        for item in self.predictions.iter() {
            let (_key, value) = item?;
            let Some(prediction) = Self::decode::<FailurePrediction>(PREDICTIONS_TREE, &value)
            else {
                continue;
            };
            match latest.get(&prediction.sensor_name) {
                Some(existing) if existing.created_at >= prediction.created_at => {}
                _ => {
                    latest.insert(prediction.sensor_name.clone(), prediction);
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    fn maintenance_records(
        &self,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceRecord>, StorageError> {
        let mut out = Vec::new();
        for item in self.maintenance.iter() {
            let (_key, value) = item?;
            let Some(record) = Self::decode::<MaintenanceRecord>(MAINTENANCE_TREE, &value) else {
                continue;
            };
            if status.map_or(true, |s| record.status == s) {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn create_maintenance_record(
        &self,
        sensor_name: &str,
        maintenance_type: MaintenanceType,
        description: &str,
        scheduled_date: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let id = self.next_id()?;
        let record = MaintenanceRecord {
            id,
            sensor_name: sensor_name.to_string(),
            maintenance_type,
            description: description.to_string(),
            scheduled_date,
            completed_date: None,
            status: MaintenanceStatus::Planned,
            created_at: Utc::now(),
        };
        let value = serde_json::to_vec(&record)?;
        self.maintenance.insert(id.to_be_bytes(), value)?;
        Ok(id)
    }

    fn update_maintenance_status(
        &self,
        id: u64,
        status: MaintenanceStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let key = id.to_be_bytes();
        let value = self
            .maintenance
            .get(key)?
            .ok_or(StorageError::MaintenanceNotFound(id))?;
        let mut record: MaintenanceRecord = serde_json::from_slice(&value)?;

        if !record.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        record.completed_date = completed_date;

        let updated = serde_json::to_vec(&record)?;
        self.maintenance.insert(key, updated)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnomalyKind, Severity};
    use chrono::Duration;

    fn open_store() -> (tempfile::TempDir, SledHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SledHistoryStore::open(dir.path().join("db")).unwrap();
        (dir, store)
    }

    fn reading(sensor: &str, value: f64, minutes_ago: i64) -> SensorReading {
        SensorReading::new(sensor, value, "pH", Utc::now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_recent_readings_newest_first() {
        let (_dir, store) = open_store();
        for i in 0..20 {
            store.insert_reading(&reading("ph", 7.0 + i as f64 * 0.01, 20 - i)).unwrap();
        }

        let recent = store.recent_readings("ph", 5).unwrap();
        assert_eq!(recent.len(), 5);
        for pair in recent.windows(2) {
            assert!(pair[0].timestamp > pair[1].timestamp, "expected newest first");
        }
        // Newest reading was inserted last (1 minute ago)
        assert!((recent[0].value - 7.19).abs() < 1e-9);
    }

    #[test]
    fn test_readings_are_isolated_per_sensor() {
        let (_dir, store) = open_store();
        store.insert_reading(&reading("ph", 7.0, 1)).unwrap();
        store.insert_reading(&reading("phosphorus", 300.0, 1)).unwrap();

        // "ph" is a prefix of "phosphorus"; the NUL separator must keep
        // their scans apart
        let ph = store.recent_readings("ph", 10).unwrap();
        assert_eq!(ph.len(), 1);
        assert_eq!(ph[0].sensor_name, "ph");
    }

    #[test]
    fn test_readings_in_range_oldest_first() {
        let (_dir, store) = open_store();
        let now = Utc::now();
        for i in 0..10 {
            let ts = now - Duration::hours(10 - i);
            store.insert_reading(&SensorReading::new("ph", 7.0, "pH", ts)).unwrap();
        }

        let ranged = store
            .readings_in_range("ph", now - Duration::hours(5), now)
            .unwrap();
        assert_eq!(ranged.len(), 5);
        for pair in ranged.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp, "expected oldest first");
        }
    }

    #[test]
    fn test_alert_round_trip() {
        let (_dir, store) = open_store();
        let event = AnomalyEvent {
            sensor_name: "ph".to_string(),
            kind: AnomalyKind::ThresholdHigh {
                value: 9.5,
                limit: 8.5,
                unit: "pH".to_string(),
            },
            message: "ph above maximum".to_string(),
            severity: Severity::High,
        };

        let id = store.create_alert(&event).unwrap();
        let alerts = store.recent_alerts(10).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, id);
        assert_eq!(alerts[0].alert_type, "threshold_high");
        assert!(alerts[0].is_active);
    }

    #[test]
    fn test_latest_predictions_supersede_by_created_at() {
        let (_dir, store) = open_store();
        let mut first = sample_prediction("nitrogen", 0.2);
        first.created_at = Utc::now() - Duration::hours(1);
        let second = sample_prediction("nitrogen", 0.4);

        store.save_prediction(&first).unwrap();
        store.save_prediction(&second).unwrap();

        let latest = store.latest_predictions().unwrap();
        assert_eq!(latest.len(), 1);
        assert!((latest[0].failure_probability - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_maintenance_lifecycle() {
        let (_dir, store) = open_store();
        let id = store
            .create_maintenance_record(
                "ph",
                MaintenanceType::UrgentMaintenance,
                "urgent check",
                Utc::now() + Duration::days(7),
            )
            .unwrap();

        let planned = store.maintenance_records(Some(MaintenanceStatus::Planned)).unwrap();
        assert_eq!(planned.len(), 1);

        store
            .update_maintenance_status(id, MaintenanceStatus::InProgress, None)
            .unwrap();
        store
            .update_maintenance_status(id, MaintenanceStatus::Completed, Some(Utc::now()))
            .unwrap();

        // Completed records cannot move backwards
        let err = store
            .update_maintenance_status(id, MaintenanceStatus::Planned, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));

        let completed = store.maintenance_records(Some(MaintenanceStatus::Completed)).unwrap();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].completed_date.is_some());
    }

    #[test]
    fn test_unknown_maintenance_id_rejected() {
        let (_dir, store) = open_store();
        let err = store
            .update_maintenance_status(999, MaintenanceStatus::Cancelled, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::MaintenanceNotFound(999)));
    }

    fn sample_prediction(sensor: &str, probability: f64) -> FailurePrediction {
        use crate::types::TrendAnalysis;
        FailurePrediction {
            sensor_name: sensor.to_string(),
            failure_probability: probability,
            reliability: 1.0 - probability,
            mean_time_to_failure_hours: 7000.0,
            predicted_failure_date: None,
            confidence_score: 0.4,
            degradation: TrendAnalysis::insufficient(0),
            current_age_hours: 100.0,
            created_at: Utc::now(),
        }
    }
}
