//! Anomaly Detection Engine
//!
//! Classifies incoming sensor readings against static thresholds, a rolling
//! z-score baseline, a short-term trend baseline, communication gaps, and
//! absolute physical bounds. A separate batch entry point detects physically
//! implausible joint states across sensors.
//!
//! The engine is stateless per call apart from a TTL-bounded cache of
//! recently fetched history windows (`cache`), which is a performance
//! optimization only — expiry or eviction never changes classification
//! results.

mod cache;
mod engine;

pub use cache::{Clock, SystemClock, WindowCache};
pub use engine::AnomalyEngine;
