//! Core data model for the fertigation analytics pipeline
//!
//! - `reading`: immutable sensor readings as ingested
//! - `anomaly`: anomaly events (tagged per-kind evidence) and severities
//! - `prediction`: Weibull failure predictions and degradation trends
//! - `maintenance`: maintenance records, status lifecycle, recommendations

mod anomaly;
mod maintenance;
mod prediction;
mod reading;

pub use anomaly::{Alert, AnomalyEvent, AnomalyKind, AnomalySummary, Severity};
pub use maintenance::{
    CostBreakdown, CostSavingsReport, MaintenanceRecord, MaintenanceStatus, MaintenanceType,
    Recommendation, RecommendationPriority,
};
pub use prediction::{DegradationTrend, FailurePrediction, TrendAnalysis};
pub use reading::SensorReading;
