//! Failure prediction per sensor and the batch analysis run
//!
//! Age estimation, confidence scoring, and the Weibull-based prediction for
//! one sensor, plus `run_analysis` which walks every configured sensor with
//! per-sensor failure isolation: one sensor's store error never aborts the
//! rest of the batch.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::trend::fit_degradation_trend;
use super::weibull::WeibullModel;
use crate::config::{ConfigError, LifetimeConfig, RigConfig};
use crate::maintenance::MaintenanceScheduler;
use crate::storage::{HistoryStore, StorageError};
use crate::types::{FailurePrediction, SensorReading, TrendAnalysis};

/// Readings scanned when locating the oldest reading for age estimation
const AGE_SCAN_LIMIT: usize = 10_000;

/// Readings counted for the confidence step function
const CONFIDENCE_SCAN_LIMIT: usize = 1_000;

/// Readings fed into the degradation trend fit
const TREND_SCAN_LIMIT: usize = 200;

/// Above this cumulative probability, failure is treated as imminent and the
/// quantile function is not extrapolated further
const IMMINENT_PROBABILITY: f64 = 0.9;

/// Conservative failure-date placeholder once failure is imminent
const IMMINENT_LEAD_HOURS: i64 = 24;

/// One sensor that failed during a batch run.
#[derive(Debug, Clone)]
pub struct SensorFailure {
    pub sensor_name: String,
    pub error: String,
}

/// Outcome of one batch analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRunSummary {
    pub started_at: DateTime<Utc>,
    pub sensors_analyzed: usize,
    pub predictions: Vec<FailurePrediction>,
    pub maintenances_scheduled: usize,
    /// Sensors whose failure probability exceeded the high-risk threshold
    pub high_risk_sensors: Vec<String>,
    pub failures: Vec<SensorFailure>,
}

/// Computes failure predictions from sensor age and the configured Weibull
/// lifetime classes.
pub struct ReliabilityEstimator {
    store: Arc<dyn HistoryStore>,
    lifetime: LifetimeConfig,
    models: BTreeMap<String, WeibullModel>,
    sensors: Vec<String>,
    high_risk_threshold: f64,
}

impl ReliabilityEstimator {
    /// Build against the effective global configuration.
    pub fn new(store: Arc<dyn HistoryStore>) -> Result<Self, ConfigError> {
        Self::from_rig_config(store, &RigConfig::current())
    }

    /// Build against an explicit configuration. Fails when any lifetime
    /// class carries invalid Weibull parameters.
    pub fn from_rig_config(
        store: Arc<dyn HistoryStore>,
        rig: &RigConfig,
    ) -> Result<Self, ConfigError> {
        let mut models = BTreeMap::new();
        for (class, params) in &rig.lifetime.classes {
            models.insert(class.clone(), WeibullModel::new(params)?);
        }
        Ok(Self {
            store,
            lifetime: rig.lifetime.clone(),
            models,
            sensors: rig.thresholds.keys().cloned().collect(),
            high_risk_threshold: rig.maintenance.high_risk_threshold,
        })
    }

    /// Sensors covered by batch analysis runs.
    pub fn monitored_sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Estimate a sensor's operating age in hours from its oldest stored
    /// reading. No history means a newly installed sensor (age 0), not an
    /// error. An oldest timestamp in the future is unusable (clock skew or
    /// a corrupted source); the count-based heuristic stands in — explicitly
    /// approximate, never a silent failure.
    pub fn estimate_sensor_age(&self, sensor_name: &str) -> Result<f64, StorageError> {
        let readings = self.store.recent_readings(sensor_name, AGE_SCAN_LIMIT)?;
        let Some(oldest) = readings.last() else {
            return Ok(0.0);
        };

        let age_hours = (Utc::now() - oldest.timestamp).num_seconds() as f64 / 3600.0;
        if age_hours >= 0.0 {
            return Ok(age_hours);
        }

        let fallback = readings.len() as f64 / self.lifetime.assumed_readings_per_hour;
        warn!(
            sensor = sensor_name,
            readings = readings.len(),
            fallback_hours = fallback,
            "Oldest reading timestamp unusable, estimating age from reading count"
        );
        Ok(fallback)
    }

    /// Confidence in a prediction as a step function of history depth.
    /// Monotonic in the number of available readings.
    pub fn confidence_score(&self, sensor_name: &str) -> Result<f64, StorageError> {
        let count = self
            .store
            .recent_readings(sensor_name, CONFIDENCE_SCAN_LIMIT)?
            .len();
        Ok(match count {
            0..=9 => 0.1,
            10..=49 => 0.4,
            50..=199 => 0.7,
            _ => 0.9,
        })
    }

    /// Fit the degradation trend over the sensor's recent history.
    pub fn analyze_degradation_trend(
        &self,
        sensor_name: &str,
    ) -> Result<TrendAnalysis, StorageError> {
        let mut readings: Vec<SensorReading> =
            self.store.recent_readings(sensor_name, TREND_SCAN_LIMIT)?;
        readings.reverse();
        Ok(fit_degradation_trend(&readings))
    }

    /// Compute a full failure prediction for one sensor at its current
    /// estimated age.
    pub fn predict(&self, sensor_name: &str) -> Result<FailurePrediction, StorageError> {
        let age_hours = self.estimate_sensor_age(sensor_name)?;
        self.predict_at_age(sensor_name, age_hours)
    }

    /// Compute a prediction for an explicit operating age. Exposed for
    /// what-if analysis; `predict` is the normal entry point.
    pub fn predict_at_age(
        &self,
        sensor_name: &str,
        age_hours: f64,
    ) -> Result<FailurePrediction, StorageError> {
        let now = Utc::now();
        let confidence_score = self.confidence_score(sensor_name)?;
        let degradation = self.analyze_degradation_trend(sensor_name)?;

        let class = self.lifetime.class_for(sensor_name);
        let Some(model) = self.models.get(class) else {
            // Unknown lifetime class: conservative all-healthy prediction.
            // Validation rejects configs that reference undefined classes,
            // so this only covers estimators built before a config reload.
            warn!(sensor = sensor_name, class, "No lifetime model for sensor class");
            return Ok(FailurePrediction {
                sensor_name: sensor_name.to_string(),
                failure_probability: 0.0,
                reliability: 1.0,
                mean_time_to_failure_hours: 0.0,
                predicted_failure_date: None,
                confidence_score: 0.0,
                degradation,
                current_age_hours: age_hours,
                created_at: now,
            });
        };

        let failure_probability = model.failure_probability(age_hours);
        let predicted_failure_date = if failure_probability < IMMINENT_PROBABILITY {
            let age_at_p90 = model.quantile(IMMINENT_PROBABILITY);
            let remaining_hours = (age_at_p90 - age_hours).max(0.0);
            Some(now + Duration::seconds((remaining_hours * 3600.0) as i64))
        } else {
            Some(now + Duration::hours(IMMINENT_LEAD_HOURS))
        };

        debug!(
            sensor = sensor_name,
            class,
            age_hours,
            failure_probability,
            confidence = confidence_score,
            "Computed failure prediction"
        );

        Ok(FailurePrediction {
            sensor_name: sensor_name.to_string(),
            failure_probability,
            reliability: 1.0 - failure_probability,
            mean_time_to_failure_hours: model.mttf_hours(),
            predicted_failure_date,
            confidence_score,
            degradation,
            current_age_hours: age_hours,
            created_at: now,
        })
    }

    /// Run predictive analysis across every monitored sensor.
    ///
    /// Each sensor is isolated: a store failure while analyzing one sensor
    /// is recorded in the summary and the batch continues. Sensors with no
    /// history are skipped (nothing to analyze yet).
    pub fn run_analysis(&self, scheduler: &MaintenanceScheduler) -> AnalysisRunSummary {
        let mut summary = AnalysisRunSummary {
            started_at: Utc::now(),
            sensors_analyzed: 0,
            predictions: Vec::new(),
            maintenances_scheduled: 0,
            high_risk_sensors: Vec::new(),
            failures: Vec::new(),
        };

        for sensor_name in &self.sensors {
            match self.analyze_sensor(sensor_name, scheduler) {
                Ok(Some((prediction, scheduled))) => {
                    summary.sensors_analyzed += 1;
                    if scheduled {
                        summary.maintenances_scheduled += 1;
                    }
                    if prediction.failure_probability > self.high_risk_threshold {
                        summary.high_risk_sensors.push(sensor_name.clone());
                    }
                    summary.predictions.push(prediction);
                }
                Ok(None) => {
                    debug!(sensor = %sensor_name, "No history yet, skipping analysis");
                }
                Err(e) => {
                    warn!(sensor = %sensor_name, error = %e, "Sensor analysis failed, continuing batch");
                    summary.failures.push(SensorFailure {
                        sensor_name: sensor_name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            analyzed = summary.sensors_analyzed,
            scheduled = summary.maintenances_scheduled,
            high_risk = summary.high_risk_sensors.len(),
            failed = summary.failures.len(),
            "Predictive analysis run complete"
        );
        summary
    }

    /// Analyze one sensor: predict, persist, and hand off to the scheduler.
    /// None when the sensor has no usable age yet.
    fn analyze_sensor(
        &self,
        sensor_name: &str,
        scheduler: &MaintenanceScheduler,
    ) -> Result<Option<(FailurePrediction, bool)>, StorageError> {
        let age_hours = self.estimate_sensor_age(sensor_name)?;
        if age_hours <= 0.0 {
            return Ok(None);
        }

        let prediction = self.predict_at_age(sensor_name, age_hours)?;
        self.store.save_prediction(&prediction)?;

        let scheduled = scheduler.schedule(&prediction)?.is_some();
        Ok(Some((prediction, scheduled)))
    }
}

// ============================================================================
// Tests
// ============================================================================
