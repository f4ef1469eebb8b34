//! Fertisense: Fertigation Sensor Intelligence
//!
//! Analytical core for a fertigation rig monitoring system.
//!
//! ## Architecture
//!
//! - **Anomaly Engine**: per-reading classification against thresholds,
//!   rolling z-score and trend baselines, communication gaps, and absolute
//!   physical bounds
//! - **Reliability Estimator**: Weibull lifetime modeling per sensor class
//!   with degradation-trend fitting
//! - **Maintenance Scheduler**: probability-band urgency tiers, deduplicated
//!   maintenance records, advisory recommendations
//! - **History Store**: narrow read/write contract over the persistence
//!   layer, injected into the engines (sled-backed or in-memory)

pub mod anomaly;
pub mod config;
pub mod maintenance;
pub mod reliability;
pub mod storage;
pub mod types;

// Re-export rig configuration
pub use config::RigConfig;

// Re-export the engines
pub use anomaly::AnomalyEngine;
pub use maintenance::MaintenanceScheduler;
pub use reliability::{AnalysisRunSummary, ReliabilityEstimator, WeibullModel};

// Re-export storage
pub use storage::{HistoryStore, MemoryStore, SledHistoryStore, StorageError};

// Re-export commonly used types
pub use types::{
    Alert, AnomalyEvent, AnomalyKind, AnomalySummary, DegradationTrend, FailurePrediction,
    MaintenanceRecord, MaintenanceStatus, MaintenanceType, Recommendation, SensorReading,
    Severity, TrendAnalysis,
};
