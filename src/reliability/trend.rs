//! Degradation trend fitting
//!
//! Least-squares slope of value against elapsed hours over a chronological
//! reading series, classified against a small stability epsilon. Confidence
//! is the absolute Pearson correlation coefficient of the same fit, treated
//! as NaN-safe (undefined correlation reports 0).

use crate::types::{DegradationTrend, SensorReading, TrendAnalysis};

/// Minimum valid points for a meaningful fit
const MIN_TREND_POINTS: usize = 10;

/// Slope magnitude (value units per hour) below which the signal is stable
const STABILITY_EPSILON: f64 = 0.01;

/// Fit a degradation trend over readings in chronological order
/// (oldest first).
pub fn fit_degradation_trend(readings: &[SensorReading]) -> TrendAnalysis {
    if readings.len() < MIN_TREND_POINTS {
        return TrendAnalysis::insufficient(readings.len());
    }

    let start = readings[0].timestamp;
    let hours: Vec<f64> = readings
        .iter()
        .map(|r| (r.timestamp - start).num_seconds() as f64 / 3600.0)
        .collect();
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();

    let Some(slope) = least_squares_slope(&hours, &values) else {
        // All readings share one timestamp; elapsed time carries no signal
        return TrendAnalysis {
            trend: DegradationTrend::Unknown,
            degradation_rate: 0.0,
            trend_confidence: 0.0,
            data_points: readings.len(),
        };
    };

    let trend = if slope.abs() < STABILITY_EPSILON {
        DegradationTrend::Stable
    } else if slope > 0.0 {
        DegradationTrend::Improving
    } else {
        DegradationTrend::Degrading
    };

    let correlation = pearson(&hours, &values);
    let trend_confidence = if correlation.is_nan() { 0.0 } else { correlation.abs() };

    TrendAnalysis {
        trend,
        degradation_rate: slope,
        trend_confidence,
        data_points: readings.len(),
    }
}

/// Least-squares slope of y over x. None when x has zero variance.
fn least_squares_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    Some(sxy / sxx)
}

/// Pearson correlation coefficient.
///
/// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
