//! Anomaly classification for incoming sensor readings
//!
//! Each check runs unconditionally and independently; results are unioned,
//! never short-circuited. Skip conditions (insufficient history, zero
//! variance, degenerate windows) suppress individual checks quietly — only
//! store failures surface as errors, so an unavailable store can never read
//! as "no anomalies".
//!
//! Trend policy: a reading is a trend anomaly when it deviates from the mean
//! of the most recent `trend_window` readings by more than
//! `trend_deviation_threshold` (fractional), with severity escalating at the
//! configured medium/high bands.

use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::cache::{Clock, WindowCache};
use crate::config::{AnomalyConfig, PhysicalBounds, RigConfig, ThresholdSpec};
use crate::storage::{HistoryStore, StorageError};
use crate::types::{AnomalyEvent, AnomalyKind, AnomalySummary, SensorReading, Severity};

/// Alerts scanned when building summaries and health scores.
const SUMMARY_ALERT_SCAN: usize = 1000;
const HEALTH_ALERT_SCAN: usize = 100;

/// Health score penalty per active alert, by severity.
fn health_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::High => 15.0,
        Severity::Medium => 8.0,
        Severity::Low => 3.0,
    }
}

/// Classifies single readings (and reading batches) against historical
/// context fetched from the injected history store.
pub struct AnomalyEngine {
    store: Arc<dyn HistoryStore>,
    thresholds: BTreeMap<String, ThresholdSpec>,
    physical_bounds: BTreeMap<String, PhysicalBounds>,
    config: AnomalyConfig,
    cache: WindowCache,
}

impl AnomalyEngine {
    /// Build against the effective global configuration.
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self::from_rig_config(store, &RigConfig::current())
    }

    /// Build against an explicit configuration (tests, embedded use).
    pub fn from_rig_config(store: Arc<dyn HistoryStore>, rig: &RigConfig) -> Self {
        Self {
            thresholds: rig.thresholds.clone(),
            physical_bounds: rig.physical_bounds.clone(),
            cache: WindowCache::new(rig.anomaly.cache_ttl_secs),
            config: rig.anomaly.clone(),
            store,
        }
    }

    /// Build with an explicit clock for the window cache (tests).
    pub fn with_clock(
        store: Arc<dyn HistoryStore>,
        rig: &RigConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            thresholds: rig.thresholds.clone(),
            physical_bounds: rig.physical_bounds.clone(),
            cache: WindowCache::with_clock(rig.anomaly.cache_ttl_secs, clock),
            config: rig.anomaly.clone(),
            store,
        }
    }

    /// Run every per-reading check and union the results.
    ///
    /// The returned list is ordered: threshold, statistical, trend,
    /// communication (when enabled), calibration. The calibration check can
    /// never be suppressed by the communication toggle or missing history.
    pub fn detect_all(&self, reading: &SensorReading) -> Result<Vec<AnomalyEvent>, StorageError> {
        let mut events = Vec::new();

        if let Some(e) = self.detect_threshold_anomaly(reading) {
            events.push(e);
        }
        if let Some(e) = self.detect_statistical_anomaly(reading)? {
            events.push(e);
        }
        if let Some(e) = self.detect_trend_anomaly(reading)? {
            events.push(e);
        }
        if self.config.communication_check_enabled {
            if let Some(e) = self.detect_communication_anomaly(reading)? {
                events.push(e);
            }
        }
        if let Some(e) = self.detect_calibration_anomaly(reading) {
            events.push(e);
        }

        if !events.is_empty() {
            debug!(
                sensor = %reading.sensor_name,
                value = reading.value,
                count = events.len(),
                "Anomalies detected"
            );
        }
        Ok(events)
    }

    /// Operational threshold check. None when the sensor has no configured
    /// ThresholdSpec or the value is inside bounds.
    pub fn detect_threshold_anomaly(&self, reading: &SensorReading) -> Option<AnomalyEvent> {
        let spec = self.thresholds.get(&reading.sensor_name)?;

        if reading.value < spec.min {
            return Some(AnomalyEvent {
                sensor_name: reading.sensor_name.clone(),
                message: format!(
                    "{} below minimum threshold: {} {} < {} {}",
                    reading.sensor_name, reading.value, reading.unit, spec.min, spec.unit
                ),
                severity: self.config.threshold_severity,
                kind: AnomalyKind::ThresholdLow {
                    value: reading.value,
                    limit: spec.min,
                    unit: spec.unit.clone(),
                },
            });
        }
        if reading.value > spec.max {
            return Some(AnomalyEvent {
                sensor_name: reading.sensor_name.clone(),
                message: format!(
                    "{} above maximum threshold: {} {} > {} {}",
                    reading.sensor_name, reading.value, reading.unit, spec.max, spec.unit
                ),
                severity: self.config.threshold_severity,
                kind: AnomalyKind::ThresholdHigh {
                    value: reading.value,
                    limit: spec.max,
                    unit: spec.unit.clone(),
                },
            });
        }
        None
    }

    /// Z-score check against the rolling window baseline.
    ///
    /// Skips on fewer than `statistical_min_points` readings (cold start)
    /// or zero variance (flat signal) — both produce false positives, not
    /// anomalies. Uses the population standard deviation of the window.
    pub fn detect_statistical_anomaly(
        &self,
        reading: &SensorReading,
    ) -> Result<Option<AnomalyEvent>, StorageError> {
        let window = self.cached_window(&reading.sensor_name, self.config.statistical_window)?;
        if window.len() < self.config.statistical_min_points {
            return Ok(None);
        }

        let values: Vec<f64> = window.iter().map(|r| r.value).collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        if std == 0.0 {
            return Ok(None);
        }

        let z_score = (reading.value - mean).abs() / std;
        let limit = self
            .thresholds
            .get(&reading.sensor_name)
            .map_or(self.config.default_z_score_limit, |t| t.z_score_limit);

        if z_score <= limit {
            return Ok(None);
        }

        Ok(Some(AnomalyEvent {
            sensor_name: reading.sensor_name.clone(),
            message: format!(
                "value {} {} is statistically anomalous for {} (z-score {:.2} over last {} readings)",
                reading.value,
                reading.unit,
                reading.sensor_name,
                z_score,
                window.len()
            ),
            severity: Severity::Medium,
            kind: AnomalyKind::Statistical {
                value: reading.value,
                z_score,
                mean,
                std,
            },
        }))
    }

    /// Short-term trend check: fractional deviation of the current value
    /// from the mean of the most recent `trend_window` readings.
    ///
    /// Skips on fewer than `trend_window` points, a perfectly flat window,
    /// or a zero window mean (degenerate denominator).
    pub fn detect_trend_anomaly(
        &self,
        reading: &SensorReading,
    ) -> Result<Option<AnomalyEvent>, StorageError> {
        let window = self.cached_window(&reading.sensor_name, self.config.trend_window)?;
        if window.len() < self.config.trend_window {
            return Ok(None);
        }

        let values: Vec<f64> = window.iter().map(|r| r.value).collect();
        if values.windows(2).all(|pair| pair[0] == pair[1]) {
            return Ok(None);
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean == 0.0 {
            return Ok(None);
        }

        let deviation = (reading.value - mean).abs() / mean.abs();
        if deviation <= self.config.trend_deviation_threshold {
            return Ok(None);
        }

        let severity = if deviation >= self.config.trend_high_band {
            Severity::High
        } else if deviation >= self.config.trend_medium_band {
            Severity::Medium
        } else {
            Severity::Low
        };

        Ok(Some(AnomalyEvent {
            sensor_name: reading.sensor_name.clone(),
            message: format!(
                "rapid variation detected for {} ({:.1}% change from recent mean)",
                reading.sensor_name,
                deviation * 100.0
            ),
            severity,
            kind: AnomalyKind::Trend {
                value: reading.value,
                deviation_fraction: deviation,
                window_mean: mean,
            },
        }))
    }

    /// Gap check between this reading and the immediately preceding stored
    /// reading for the same sensor. Gated behind
    /// `communication_check_enabled` in [`Self::detect_all`].
    pub fn detect_communication_anomaly(
        &self,
        reading: &SensorReading,
    ) -> Result<Option<AnomalyEvent>, StorageError> {
        // Uncached: the gap must reflect the latest stored reading, and the
        // current reading may or may not have been persisted yet.
        let recent = self.store.recent_readings(&reading.sensor_name, 2)?;
        let Some(previous) = recent.iter().find(|r| r.timestamp < reading.timestamp) else {
            return Ok(None);
        };

        let gap = reading.timestamp - previous.timestamp;
        if gap <= Duration::seconds(self.config.communication_gap_secs) {
            return Ok(None);
        }

        Ok(Some(AnomalyEvent {
            sensor_name: reading.sensor_name.clone(),
            message: format!(
                "prolonged communication loss for {}: {:.1} minutes without readings",
                reading.sensor_name,
                gap.num_seconds() as f64 / 60.0
            ),
            severity: Severity::Medium,
            kind: AnomalyKind::Communication {
                gap_seconds: gap.num_seconds(),
            },
        }))
    }

    /// Physical-impossibility check against absolute sensor ranges.
    /// Always Critical; independent of history and of the communication
    /// toggle.
    pub fn detect_calibration_anomaly(&self, reading: &SensorReading) -> Option<AnomalyEvent> {
        let bounds = self.physical_bounds.get(&reading.sensor_name)?;
        if reading.value >= bounds.min && reading.value <= bounds.max {
            return None;
        }

        Some(AnomalyEvent {
            sensor_name: reading.sensor_name.clone(),
            message: format!(
                "physically impossible value for {}: {} {} (valid range {} to {})",
                reading.sensor_name, reading.value, reading.unit, bounds.min, bounds.max
            ),
            severity: Severity::Critical,
            kind: AnomalyKind::Calibration {
                value: reading.value,
                min: bounds.min,
                max: bounds.max,
            },
        })
    }

    /// Cross-sensor correlation check over a batch of simultaneous readings.
    ///
    /// Default rule: temperature and humidity are inversely correlated, so
    /// high temperature together with high humidity is implausible.
    pub fn detect_correlation_anomalies(&self, readings: &[SensorReading]) -> Vec<AnomalyEvent> {
        let mut events = Vec::new();

        let temperature = readings.iter().find(|r| r.sensor_name == "temperature");
        let humidity = readings.iter().find(|r| r.sensor_name == "humidity");

        if let (Some(temp), Some(hum)) = (temperature, humidity) {
            if temp.value > self.config.correlation_temperature_limit
                && hum.value > self.config.correlation_humidity_limit
            {
                events.push(AnomalyEvent {
                    sensor_name: "temperature_humidity".to_string(),
                    message: format!(
                        "abnormal correlation: high temperature ({} °C) with high humidity ({} %)",
                        temp.value, hum.value
                    ),
                    severity: Severity::Medium,
                    kind: AnomalyKind::Correlation {
                        pair: "temperature_humidity".to_string(),
                        first: temp.value,
                        second: hum.value,
                    },
                });
            }
        }

        events
    }

    /// Count persisted alerts by anomaly family over the trailing window.
    pub fn anomaly_summary(&self, hours_back: i64) -> Result<AnomalySummary, StorageError> {
        let cutoff = chrono::Utc::now() - Duration::hours(hours_back);
        let alerts = self.store.recent_alerts(SUMMARY_ALERT_SCAN)?;

        let mut summary = AnomalySummary::default();
        for alert in alerts.iter().filter(|a| a.created_at >= cutoff) {
            summary.total += 1;
            let t = alert.alert_type.as_str();
            if t.contains("threshold") {
                summary.threshold += 1;
            } else if t.contains("statistical") {
                summary.statistical += 1;
            } else if t.contains("trend") {
                summary.trend += 1;
            } else if t.contains("communication") {
                summary.communication += 1;
            } else if t.contains("correlation") {
                summary.correlation += 1;
            } else if t.contains("calibration") {
                summary.calibration += 1;
            }
        }
        Ok(summary)
    }

    /// Health score for one sensor in [0, 100]: starts at 100, subtracts a
    /// severity-weighted penalty per active alert and a data-regularity
    /// penalty when recent readings are sparse.
    pub fn sensor_health_score(&self, sensor_name: &str) -> Result<f64, StorageError> {
        let alerts = self.store.recent_alerts(HEALTH_ALERT_SCAN)?;
        let mut score = 100.0;

        for alert in alerts
            .iter()
            .filter(|a| a.sensor_name == sensor_name && a.is_active)
        {
            score -= health_penalty(alert.severity);
        }

        let recent = self.store.recent_readings(sensor_name, 10)?;
        if recent.len() < 5 {
            score -= 20.0;
        }

        Ok(score.clamp(0.0, 100.0))
    }

    fn cached_window(
        &self,
        sensor_name: &str,
        window_size: usize,
    ) -> Result<Arc<Vec<SensorReading>>, StorageError> {
        self.cache.get_or_fetch(sensor_name, window_size, || {
            self.store.recent_readings(sensor_name, window_size)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
