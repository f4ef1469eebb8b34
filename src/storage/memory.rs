//! In-memory History Store
//!
//! Implements the full [`HistoryStore`] contract over lock-guarded vectors.
//! Used as the injected mock in engine tests and for demo runs without a
//! database directory.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{HistoryStore, StorageError};
use crate::types::{
    Alert, AnomalyEvent, FailurePrediction, MaintenanceRecord, MaintenanceStatus, MaintenanceType,
    SensorReading,
};

#[derive(Default)]
struct Inner {
    readings: BTreeMap<String, Vec<SensorReading>>,
    alerts: Vec<Alert>,
    predictions: Vec<FailurePrediction>,
    maintenance: Vec<MaintenanceRecord>,
    next_id: u64,
}

/// Lock-guarded in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Insert a batch of readings (test convenience).
    pub fn insert_readings(&self, readings: &[SensorReading]) -> Result<(), StorageError> {
        for r in readings {
            self.insert_reading(r)?;
        }
        Ok(())
    }
}

impl HistoryStore for MemoryStore {
    fn insert_reading(&self, reading: &SensorReading) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let series = inner.readings.entry(reading.sensor_name.clone()).or_default();
        series.push(reading.clone());
        series.sort_by_key(|r| r.timestamp);
        Ok(())
    }

    fn recent_readings(
        &self,
        sensor_name: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .readings
            .get(sensor_name)
            .map(|series| series.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn readings_in_range(
        &self,
        sensor_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .readings
            .get(sensor_name)
            .map(|series| {
                series
                    .iter()
                    .filter(|r| r.timestamp >= start && r.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_alert(&self, event: &AnomalyEvent) -> Result<u64, StorageError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.alerts.push(Alert {
            id,
            sensor_name: event.sensor_name.clone(),
            alert_type: event.kind.label().to_string(),
            message: event.message.clone(),
            severity: event.severity,
            created_at: Utc::now(),
            is_active: true,
        });
        Ok(id)
    }

    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StorageError> {
        let inner = self.lock();
        Ok(inner.alerts.iter().rev().take(limit).cloned().collect())
    }

    fn save_prediction(&self, prediction: &FailurePrediction) -> Result<(), StorageError> {
        self.lock().predictions.push(prediction.clone());
        Ok(())
    }

    fn latest_predictions(&self) -> Result<Vec<FailurePrediction>, StorageError> {
        let inner = self.lock();
        let mut latest: BTreeMap<String, FailurePrediction> = BTreeMap::new();
        for p in &inner.predictions {
            match latest.get(&p.sensor_name) {
                Some(existing) if existing.created_at >= p.created_at => {}
                _ => {
                    latest.insert(p.sensor_name.clone(), p.clone());
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    fn maintenance_records(
        &self,
        status: Option<MaintenanceStatus>,
    ) -> Result<Vec<MaintenanceRecord>, StorageError> {
        let inner = self.lock();
        Ok(inner
            .maintenance
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }

    fn create_maintenance_record(
        &self,
        sensor_name: &str,
        maintenance_type: MaintenanceType,
        description: &str,
        scheduled_date: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.maintenance.push(MaintenanceRecord {
            id,
            sensor_name: sensor_name.to_string(),
            maintenance_type,
            description: description.to_string(),
            scheduled_date,
            completed_date: None,
            status: MaintenanceStatus::Planned,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn update_maintenance_status(
        &self,
        id: u64,
        status: MaintenanceStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let record = inner
            .maintenance
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StorageError::MaintenanceNotFound(id))?;

        if !record.status.can_transition_to(status) {
            return Err(StorageError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }
        record.status = status;
        record.completed_date = completed_date;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_recent_readings_order_and_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        // Insert out of chronological order
        for i in [3i64, 1, 4, 2, 5] {
            store
                .insert_reading(&SensorReading::new(
                    "ph",
                    7.0 + i as f64,
                    "pH",
                    now - Duration::minutes(i),
                ))
                .unwrap();
        }

        let recent = store.recent_readings("ph", 3).unwrap();
        assert_eq!(recent.len(), 3);
        // Newest first: 1, 2, 3 minutes ago
        assert!((recent[0].value - 8.0).abs() < 1e-9);
        assert!((recent[1].value - 9.0).abs() < 1e-9);
        assert!((recent[2].value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_sensor_is_empty_not_error() {
        let store = MemoryStore::new();
        assert!(store.recent_readings("nope", 10).unwrap().is_empty());
        assert!(store
            .readings_in_range("nope", Utc::now() - Duration::hours(1), Utc::now())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_maintenance_transition_enforced() {
        let store = MemoryStore::new();
        let id = store
            .create_maintenance_record(
                "ph",
                MaintenanceType::PreventiveInspection,
                "check",
                Utc::now(),
            )
            .unwrap();

        store
            .update_maintenance_status(id, MaintenanceStatus::Cancelled, None)
            .unwrap();
        let err = store
            .update_maintenance_status(id, MaintenanceStatus::InProgress, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidTransition { .. }));
    }
}
