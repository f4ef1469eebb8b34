//! Anomaly events and the alert severity scale
//!
//! Each anomaly kind carries only the numeric evidence relevant to that kind,
//! so downstream handling is exhaustive at compile time instead of probing a
//! loosely-typed payload for optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity, ordered from least to most urgent.
///
/// This four-level scale is the single severity taxonomy for the whole
/// anomaly engine. The numeric rank (1-4) is available for storage layers
/// and UIs that sort by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank: low=1 .. critical=4
    pub fn rank(self) -> u8 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Kind of anomaly, tagged with the evidence that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Value below the configured operational minimum
    ThresholdLow { value: f64, limit: f64, unit: String },

    /// Value above the configured operational maximum
    ThresholdHigh { value: f64, limit: f64, unit: String },

    /// Z-score outlier against the rolling window baseline
    Statistical {
        value: f64,
        z_score: f64,
        mean: f64,
        std: f64,
    },

    /// Rapid deviation from the short-term mean
    Trend {
        value: f64,
        /// Fractional deviation from the window mean (0.25 = 25%)
        deviation_fraction: f64,
        window_mean: f64,
    },

    /// Gap between consecutive readings exceeded the configured maximum
    Communication { gap_seconds: i64 },

    /// Value outside the sensor's absolute physical range
    Calibration { value: f64, min: f64, max: f64 },

    /// Physically implausible joint state across two sensors
    Correlation {
        /// Synthetic pair name, e.g. "temperature_humidity"
        pair: String,
        first: f64,
        second: f64,
    },
}

impl AnomalyKind {
    /// Stable string label used for alert persistence and summary bucketing.
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyKind::ThresholdLow { .. } => "threshold_low",
            AnomalyKind::ThresholdHigh { .. } => "threshold_high",
            AnomalyKind::Statistical { .. } => "statistical_anomaly",
            AnomalyKind::Trend { .. } => "trend_anomaly",
            AnomalyKind::Communication { .. } => "communication_anomaly",
            AnomalyKind::Calibration { .. } => "calibration_anomaly",
            AnomalyKind::Correlation { .. } => "correlation_anomaly",
        }
    }
}

/// One anomaly detected for a single reading (or reading batch, for
/// correlation checks). Value object: the caller decides whether to persist
/// it as an [`Alert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub sensor_name: String,
    pub kind: AnomalyKind,
    /// Human-readable description including the offending value and context
    pub message: String,
    pub severity: Severity,
}

/// Persisted form of an anomaly event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub sensor_name: String,
    /// [`AnomalyKind::label`] of the originating event
    pub alert_type: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Count of recent alerts bucketed by anomaly family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total: usize,
    pub threshold: usize,
    pub statistical: usize,
    pub trend: usize,
    pub communication: usize,
    pub correlation: usize,
    pub calibration: usize,
}
