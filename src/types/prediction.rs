//! Failure predictions produced by the reliability estimator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a sensor's value drift over its recent history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegradationTrend {
    /// Slope magnitude below the stability epsilon
    Stable,
    /// Positive slope
    Improving,
    /// Negative slope
    Degrading,
    /// Fewer than the minimum valid points for a fit
    InsufficientData,
    Unknown,
}

impl std::fmt::Display for DegradationTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradationTrend::Stable => write!(f, "STABLE"),
            DegradationTrend::Improving => write!(f, "IMPROVING"),
            DegradationTrend::Degrading => write!(f, "DEGRADING"),
            DegradationTrend::InsufficientData => write!(f, "INSUFFICIENT_DATA"),
            DegradationTrend::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Result of the linear degradation fit over recent readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: DegradationTrend,
    /// Fitted slope in value units per hour
    pub degradation_rate: f64,
    /// |Pearson r| of the fit; 0.0 when the correlation is undefined
    pub trend_confidence: f64,
    pub data_points: usize,
}

impl TrendAnalysis {
    /// Conservative placeholder when no fit could be made.
    pub fn insufficient(data_points: usize) -> Self {
        Self {
            trend: DegradationTrend::InsufficientData,
            degradation_rate: 0.0,
            trend_confidence: 0.0,
            data_points,
        }
    }
}

/// Full reliability assessment for one sensor at one point in time.
///
/// Predictions are append-only: each analysis run creates a new record and
/// "latest per sensor" is derived by `max(created_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePrediction {
    pub sensor_name: String,

    /// Weibull CDF at the current age; probability the sensor has already
    /// failed under the fitted lifetime distribution. Always in [0, 1].
    pub failure_probability: f64,

    /// 1 - failure_probability
    pub reliability: f64,

    /// η · Γ(1 + 1/β), in hours
    pub mean_time_to_failure_hours: f64,

    /// Forward estimate of when cumulative failure probability reaches 0.9.
    /// `None` only when the lifetime class is unknown.
    pub predicted_failure_date: Option<DateTime<Utc>>,

    /// Step function of available history depth, in [0, 1]
    pub confidence_score: f64,

    pub degradation: TrendAnalysis,

    /// Estimated operating age when this prediction was made
    pub current_age_hours: f64,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_display_matches_wire_format() {
        assert_eq!(DegradationTrend::InsufficientData.to_string(), "INSUFFICIENT_DATA");
        assert_eq!(
            serde_json::to_string(&DegradationTrend::Degrading).unwrap(),
            "\"DEGRADING\""
        );
    }
}
