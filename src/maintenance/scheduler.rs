//! Probability-band maintenance scheduling with dedup
//!
//! Tier mapping:
//!
//! | failure probability | tier | scheduled date |
//! |---|---|---|
//! | < 0.3 | preventive_inspection | predicted failure − 30 d, else now + 90 d |
//! | < 0.6 | preventive_maintenance | predicted failure − 14 d, else now + 30 d |
//! | < 0.8 | urgent_maintenance | predicted failure − 7 d, else now + 7 d |
//! | ≥ 0.8 | emergency_maintenance | now + 24 h |
//!
//! An equivalent planned record for the same (sensor, tier) makes scheduling
//! a no-op, not an error.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{MaintenanceConfig, RigConfig};
use crate::storage::{HistoryStore, StorageError};
use crate::types::{FailurePrediction, MaintenanceStatus, MaintenanceType};

/// Creates and deduplicates maintenance records from failure predictions.
pub struct MaintenanceScheduler {
    store: Arc<dyn HistoryStore>,
    config: MaintenanceConfig,
}

impl MaintenanceScheduler {
    /// Build against the effective global configuration.
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self::from_rig_config(store, &RigConfig::current())
    }

    /// Build against an explicit configuration.
    pub fn from_rig_config(store: Arc<dyn HistoryStore>, rig: &RigConfig) -> Self {
        Self {
            store,
            config: rig.maintenance.clone(),
        }
    }

    pub(crate) fn store(&self) -> &dyn HistoryStore {
        self.store.as_ref()
    }

    pub(crate) fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// Maintenance tier for a failure probability.
    pub fn tier_for(failure_probability: f64) -> MaintenanceType {
        if failure_probability < 0.3 {
            MaintenanceType::PreventiveInspection
        } else if failure_probability < 0.6 {
            MaintenanceType::PreventiveMaintenance
        } else if failure_probability < 0.8 {
            MaintenanceType::UrgentMaintenance
        } else {
            MaintenanceType::EmergencyMaintenance
        }
    }

    /// Create a maintenance record for a prediction unless one is already
    /// planned for the same (sensor, tier).
    ///
    /// Returns the new record id, or `None` when the probability is below
    /// the scheduling floor or an equivalent planned record exists.
    pub fn schedule(&self, prediction: &FailurePrediction) -> Result<Option<u64>, StorageError> {
        let probability = prediction.failure_probability;
        if probability <= self.config.schedule_probability_floor {
            return Ok(None);
        }

        let tier = Self::tier_for(probability);

        let planned = self.store.maintenance_records(Some(MaintenanceStatus::Planned))?;
        if planned
            .iter()
            .any(|r| r.sensor_name == prediction.sensor_name && r.maintenance_type == tier)
        {
            debug!(
                sensor = %prediction.sensor_name,
                tier = %tier,
                "Equivalent maintenance already planned, skipping"
            );
            return Ok(None);
        }

        let scheduled_date = Self::scheduled_date(tier, prediction.predicted_failure_date);

        let mut description = format!(
            "{} for {}. Failure probability: {:.1}%.",
            tier, prediction.sensor_name, probability * 100.0
        );
        if let Some(failure_date) = prediction.predicted_failure_date {
            description.push_str(&format!(
                " Predicted failure on {}.",
                failure_date.format("%Y-%m-%d %H:%M")
            ));
        }

        let id = self.store.create_maintenance_record(
            &prediction.sensor_name,
            tier,
            &description,
            scheduled_date,
        )?;

        info!(
            sensor = %prediction.sensor_name,
            tier = %tier,
            probability,
            scheduled = %scheduled_date,
            id,
            "Maintenance scheduled"
        );
        Ok(Some(id))
    }

    /// Lead-time policy per tier.
    fn scheduled_date(
        tier: MaintenanceType,
        predicted_failure_date: Option<DateTime<Utc>>,
    ) -> DateTime<Utc> {
        let now = Utc::now();
        match tier {
            MaintenanceType::PreventiveInspection => predicted_failure_date
                .map_or(now + Duration::days(90), |d| d - Duration::days(30)),
            MaintenanceType::PreventiveMaintenance => predicted_failure_date
                .map_or(now + Duration::days(30), |d| d - Duration::days(14)),
            MaintenanceType::UrgentMaintenance => {
                predicted_failure_date.map_or(now + Duration::days(7), |d| d - Duration::days(7))
            }
            MaintenanceType::EmergencyMaintenance => now + Duration::hours(24),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
