//! Sensor readings as delivered by the ingestion layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single periodic reading from one physical sensor channel.
///
/// Readings are immutable once recorded: the ingestion layer creates them,
/// the history store persists them, and the analytical engines only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor channel name (e.g. "ph", "nitrogen", "water_flow")
    pub sensor_name: String,

    /// Measured value in `unit`
    pub value: f64,

    /// Measurement unit as reported by the rig (e.g. "pH", "mg/kg", "L/min")
    pub unit: String,

    /// Acquisition timestamp (UTC)
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(sensor_name: &str, value: f64, unit: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_name: sensor_name.to_string(),
            value,
            unit: unit.to_string(),
            timestamp,
        }
    }
}
