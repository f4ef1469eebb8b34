//! Rig Configuration - sensor thresholds and lifetime parameters as
//! operator-tunable TOML values
//!
//! Every threshold the analytical engines consult is a field in this module.
//! Each struct implements `Default` with values matching the commissioning
//! constants for a standard fertigation rig, ensuring zero-change behavior
//! when no config file is present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::Severity;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration:\n{0}")]
    Invalid(String),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a fertigation rig deployment.
///
/// Load with `RigConfig::load()` which searches:
/// 1. `$FERTISENSE_CONFIG` env var
/// 2. `./rig_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Rig identification
    #[serde(default)]
    pub rig: RigInfo,

    /// Per-sensor operational thresholds for anomaly detection
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, ThresholdSpec>,

    /// Per-sensor absolute physical bounds (calibration check)
    #[serde(default = "default_physical_bounds")]
    pub physical_bounds: BTreeMap<String, PhysicalBounds>,

    /// Anomaly engine tuning
    #[serde(default)]
    pub anomaly: AnomalyConfig,

    /// Weibull lifetime model parameterization
    #[serde(default)]
    pub lifetime: LifetimeConfig,

    /// Maintenance scheduling policy and cost model
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            rig: RigInfo::default(),
            thresholds: default_thresholds(),
            physical_bounds: default_physical_bounds(),
            anomaly: AnomalyConfig::default(),
            lifetime: LifetimeConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

/// Rig identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigInfo {
    #[serde(default = "default_rig_name")]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

fn default_rig_name() -> String {
    "FERTIGATION-1".to_string()
}

impl Default for RigInfo {
    fn default() -> Self {
        Self {
            name: default_rig_name(),
            location: String::new(),
        }
    }
}

// ============================================================================
// Sensor Thresholds
// ============================================================================

/// Operational bounds and z-score limit for one sensor channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub min: f64,
    pub max: f64,
    pub unit: String,
    /// Z-score above which a reading is a statistical anomaly
    #[serde(default = "default_z_score_limit")]
    pub z_score_limit: f64,
}

fn default_z_score_limit() -> f64 {
    3.0
}

impl ThresholdSpec {
    pub fn new(min: f64, max: f64, unit: &str, z_score_limit: f64) -> Self {
        Self {
            min,
            max,
            unit: unit.to_string(),
            z_score_limit,
        }
    }
}

/// Absolute physical range for a sensor. Values outside are impossible
/// regardless of operational context (e.g. pH outside [0, 14]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalBounds {
    pub min: f64,
    pub max: f64,
}

fn default_thresholds() -> BTreeMap<String, ThresholdSpec> {
    let mut t = BTreeMap::new();
    t.insert("nitrogen".into(), ThresholdSpec::new(200.0, 800.0, "mg/kg", 2.5));
    t.insert("phosphorus".into(), ThresholdSpec::new(100.0, 500.0, "mg/kg", 2.5));
    t.insert("potassium".into(), ThresholdSpec::new(300.0, 900.0, "mg/kg", 2.5));
    t.insert("ph".into(), ThresholdSpec::new(5.5, 8.5, "pH", 2.0));
    t.insert("conductivity".into(), ThresholdSpec::new(500.0, 2000.0, "µS/cm", 2.5));
    t.insert("temperature".into(), ThresholdSpec::new(10.0, 40.0, "°C", 2.0));
    t.insert("humidity".into(), ThresholdSpec::new(30.0, 90.0, "%", 2.0));
    t.insert("salinity".into(), ThresholdSpec::new(200.0, 1500.0, "ppm", 2.5));
    t.insert("water_level".into(), ThresholdSpec::new(10.0, 100.0, "%", 2.0));
    t.insert("water_temperature".into(), ThresholdSpec::new(15.0, 35.0, "°C", 2.0));
    t.insert("water_flow".into(), ThresholdSpec::new(1.0, 15.0, "L/min", 2.5));
    t.insert("water_pressure".into(), ThresholdSpec::new(0.5, 3.0, "bar", 2.0));
    t
}

fn default_physical_bounds() -> BTreeMap<String, PhysicalBounds> {
    let mut b = BTreeMap::new();
    b.insert("ph".into(), PhysicalBounds { min: 0.0, max: 14.0 });
    b.insert("temperature".into(), PhysicalBounds { min: -50.0, max: 100.0 });
    b.insert("humidity".into(), PhysicalBounds { min: 0.0, max: 100.0 });
    b.insert("water_level".into(), PhysicalBounds { min: 0.0, max: 100.0 });
    b.insert("conductivity".into(), PhysicalBounds { min: 0.0, max: 10000.0 });
    b.insert("nitrogen".into(), PhysicalBounds { min: 0.0, max: 5000.0 });
    b.insert("phosphorus".into(), PhysicalBounds { min: 0.0, max: 2000.0 });
    b.insert("potassium".into(), PhysicalBounds { min: 0.0, max: 3000.0 });
    b
}

// ============================================================================
// Anomaly Engine Tuning
// ============================================================================

/// Tuning for the anomaly engine's statistical, trend, communication and
/// correlation checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Readings fetched for the z-score baseline
    #[serde(default = "default_statistical_window")]
    pub statistical_window: usize,

    /// Minimum readings before the statistical check runs
    #[serde(default = "default_statistical_min_points")]
    pub statistical_min_points: usize,

    /// Z-score limit for sensors without a ThresholdSpec
    #[serde(default = "default_z_score_limit")]
    pub default_z_score_limit: f64,

    /// Readings in the short-term trend window
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Fractional deviation from the trend-window mean that flags a trend
    /// anomaly (0.2 = 20%)
    #[serde(default = "default_trend_deviation")]
    pub trend_deviation_threshold: f64,

    /// Deviation band where trend severity escalates to medium
    #[serde(default = "default_trend_medium_band")]
    pub trend_medium_band: f64,

    /// Deviation band where trend severity escalates to high
    #[serde(default = "default_trend_high_band")]
    pub trend_high_band: f64,

    /// Severity assigned to operational threshold breaches
    #[serde(default = "default_threshold_severity")]
    pub threshold_severity: Severity,

    /// Whether the communication-gap check runs. Off by default: simulated
    /// deployments replay history in bursts and would alert constantly.
    #[serde(default)]
    pub communication_check_enabled: bool,

    /// Gap between consecutive readings that flags a communication anomaly
    #[serde(default = "default_communication_gap_secs")]
    pub communication_gap_secs: i64,

    /// TTL for cached history windows
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,

    /// Correlation rule: temperature above this with humidity above
    /// `correlation_humidity_limit` is physically implausible
    #[serde(default = "default_correlation_temperature_limit")]
    pub correlation_temperature_limit: f64,

    #[serde(default = "default_correlation_humidity_limit")]
    pub correlation_humidity_limit: f64,
}

fn default_statistical_window() -> usize {
    100
}
fn default_statistical_min_points() -> usize {
    10
}
fn default_trend_window() -> usize {
    5
}
fn default_trend_deviation() -> f64 {
    0.2
}
fn default_trend_medium_band() -> f64 {
    0.3
}
fn default_trend_high_band() -> f64 {
    0.5
}
fn default_threshold_severity() -> Severity {
    Severity::High
}
fn default_communication_gap_secs() -> i64 {
    300
}
fn default_cache_ttl_secs() -> i64 {
    300
}
fn default_correlation_temperature_limit() -> f64 {
    30.0
}
fn default_correlation_humidity_limit() -> f64 {
    80.0
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            statistical_window: default_statistical_window(),
            statistical_min_points: default_statistical_min_points(),
            default_z_score_limit: default_z_score_limit(),
            trend_window: default_trend_window(),
            trend_deviation_threshold: default_trend_deviation(),
            trend_medium_band: default_trend_medium_band(),
            trend_high_band: default_trend_high_band(),
            threshold_severity: default_threshold_severity(),
            communication_check_enabled: false,
            communication_gap_secs: default_communication_gap_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            correlation_temperature_limit: default_correlation_temperature_limit(),
            correlation_humidity_limit: default_correlation_humidity_limit(),
        }
    }
}

// ============================================================================
// Lifetime Model Parameters
// ============================================================================

/// Two-parameter Weibull lifetime distribution for one sensor class,
/// with an optional location offset γ (hours before wear-out can begin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifetimeParameters {
    /// Shape β
    pub shape: f64,
    /// Scale η in hours
    pub scale: f64,
    /// Location γ in hours
    #[serde(default)]
    pub location: f64,
}

/// Sensor-name → lifetime-class mapping plus the per-class Weibull
/// parameters. Many sensors share one physical assembly (all NPK channels
/// live on the same probe), so the mapping is many-to-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifetimeConfig {
    #[serde(default = "default_lifetime_classes")]
    pub classes: BTreeMap<String, LifetimeParameters>,

    #[serde(default = "default_sensor_classes")]
    pub sensor_classes: BTreeMap<String, String>,

    /// Class assumed for sensors missing from `sensor_classes`
    #[serde(default = "default_lifetime_class")]
    pub default_class: String,

    /// Assumed sampling rate (readings per hour) for the count-based age
    /// fallback when timestamps are unusable
    #[serde(default = "default_assumed_readings_per_hour")]
    pub assumed_readings_per_hour: f64,
}

fn default_lifetime_classes() -> BTreeMap<String, LifetimeParameters> {
    let mut c = BTreeMap::new();
    // ~1 year characteristic life
    c.insert("npk_sensor".into(), LifetimeParameters { shape: 2.5, scale: 8760.0, location: 0.0 });
    // ~2 years
    c.insert(
        "water_level_sensor".into(),
        LifetimeParameters { shape: 1.8, scale: 17520.0, location: 0.0 },
    );
    // ~1.5 years
    c.insert(
        "water_flow_sensor".into(),
        LifetimeParameters { shape: 2.2, scale: 13140.0, location: 0.0 },
    );
    c
}

fn default_sensor_classes() -> BTreeMap<String, String> {
    let npk = [
        "nitrogen",
        "phosphorus",
        "potassium",
        "ph",
        "conductivity",
        "temperature",
        "humidity",
        "salinity",
    ];
    let level = ["water_level", "water_temperature"];
    let flow = ["water_flow", "water_pressure"];

    let mut m = BTreeMap::new();
    for s in npk {
        m.insert(s.to_string(), "npk_sensor".to_string());
    }
    for s in level {
        m.insert(s.to_string(), "water_level_sensor".to_string());
    }
    for s in flow {
        m.insert(s.to_string(), "water_flow_sensor".to_string());
    }
    m
}

fn default_lifetime_class() -> String {
    "npk_sensor".to_string()
}

fn default_assumed_readings_per_hour() -> f64 {
    60.0
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            classes: default_lifetime_classes(),
            sensor_classes: default_sensor_classes(),
            default_class: default_lifetime_class(),
            assumed_readings_per_hour: default_assumed_readings_per_hour(),
        }
    }
}

impl LifetimeConfig {
    /// Resolve the lifetime class name for a sensor.
    pub fn class_for(&self, sensor_name: &str) -> &str {
        self.sensor_classes
            .get(sensor_name)
            .map_or(self.default_class.as_str(), String::as_str)
    }

    /// Resolve the Weibull parameters for a sensor, falling back to the
    /// default class. `None` only when the config names a missing class,
    /// which validation rejects at load time.
    pub fn params_for(&self, sensor_name: &str) -> Option<&LifetimeParameters> {
        self.classes.get(self.class_for(sensor_name))
    }
}

// ============================================================================
// Maintenance Policy
// ============================================================================

/// Scheduling floors and the flat cost model used for savings reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Minimum failure probability before a maintenance record is created
    #[serde(default = "default_schedule_probability_floor")]
    pub schedule_probability_floor: f64,

    /// Failure probability above which a sensor is reported as high-risk
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,

    /// Flat cost of one preventive intervention
    #[serde(default = "default_preventive_cost")]
    pub preventive_cost: f64,

    /// Flat cost of one corrective (urgent) intervention
    #[serde(default = "default_corrective_cost")]
    pub corrective_cost: f64,

    /// Flat cost of one emergency repair
    #[serde(default = "default_emergency_cost")]
    pub emergency_cost: f64,
}

fn default_schedule_probability_floor() -> f64 {
    0.2
}
fn default_high_risk_threshold() -> f64 {
    0.6
}
fn default_preventive_cost() -> f64 {
    100.0
}
fn default_corrective_cost() -> f64 {
    500.0
}
fn default_emergency_cost() -> f64 {
    1500.0
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            schedule_probability_floor: default_schedule_probability_floor(),
            high_risk_threshold: default_high_risk_threshold(),
            preventive_cost: default_preventive_cost(),
            corrective_cost: default_corrective_cost(),
            emergency_cost: default_emergency_cost(),
        }
    }
}

// ============================================================================
// Loading & Validation
// ============================================================================

impl RigConfig {
    /// Load configuration using the standard search order:
    /// 1. `$FERTISENSE_CONFIG` environment variable
    /// 2. `./rig_config.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// A file that exists but fails to parse or validate is a hard error:
    /// silently falling back to defaults would mask an operator mistake.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("FERTISENSE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                let config = Self::load_from_file(&p)?;
                info!(path = %p.display(), rig = %config.rig.name, "Loaded rig config from FERTISENSE_CONFIG");
                return Ok(config);
            }
            warn!(path = %path, "FERTISENSE_CONFIG points to non-existent file, falling back");
        }

        let local = PathBuf::from("rig_config.toml");
        if local.exists() {
            let config = Self::load_from_file(&local)?;
            info!(rig = %config.rig.name, "Loaded rig config from ./rig_config.toml");
            return Ok(config);
        }

        info!("No rig_config.toml found — using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Snapshot of the effective configuration: the initialized global when
    /// present, otherwise built-in defaults. Engines clone their sections
    /// from this at construction so tests can substitute their own.
    pub fn current() -> Self {
        if super::is_initialized() {
            super::get().clone()
        } else {
            Self::default()
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all thresholds and model parameters for internal
    /// consistency. Collects every violation rather than stopping at the
    /// first, so an operator can fix a config file in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        for (sensor, spec) in &self.thresholds {
            if spec.min >= spec.max {
                errors.push(format!(
                    "thresholds.{sensor}: min ({}) must be less than max ({})",
                    spec.min, spec.max
                ));
            }
            if spec.z_score_limit <= 0.0 {
                errors.push(format!(
                    "thresholds.{sensor}: z_score_limit ({}) must be positive",
                    spec.z_score_limit
                ));
            }
        }

        for (sensor, bounds) in &self.physical_bounds {
            if bounds.min >= bounds.max {
                errors.push(format!(
                    "physical_bounds.{sensor}: min ({}) must be less than max ({})",
                    bounds.min, bounds.max
                ));
            }
        }

        let a = &self.anomaly;
        if a.statistical_min_points < 2 {
            errors.push("anomaly.statistical_min_points must be at least 2".to_string());
        }
        if a.statistical_window < a.statistical_min_points {
            errors.push(format!(
                "anomaly.statistical_window ({}) must be >= statistical_min_points ({})",
                a.statistical_window, a.statistical_min_points
            ));
        }
        if a.trend_window < 2 {
            errors.push("anomaly.trend_window must be at least 2".to_string());
        }
        if !(a.trend_deviation_threshold > 0.0
            && a.trend_deviation_threshold < a.trend_medium_band
            && a.trend_medium_band < a.trend_high_band)
        {
            errors.push(format!(
                "anomaly trend bands must escalate: 0 < {} < {} < {}",
                a.trend_deviation_threshold, a.trend_medium_band, a.trend_high_band
            ));
        }
        if a.communication_gap_secs <= 0 {
            errors.push("anomaly.communication_gap_secs must be positive".to_string());
        }
        if a.cache_ttl_secs <= 0 {
            errors.push("anomaly.cache_ttl_secs must be positive".to_string());
        }

        for (class, params) in &self.lifetime.classes {
            if params.shape <= 0.0 {
                errors.push(format!(
                    "lifetime.classes.{class}: shape ({}) must be positive",
                    params.shape
                ));
            }
            if params.scale <= 0.0 {
                errors.push(format!(
                    "lifetime.classes.{class}: scale ({}) must be positive",
                    params.scale
                ));
            }
            if params.location < 0.0 {
                errors.push(format!(
                    "lifetime.classes.{class}: location ({}) must be non-negative",
                    params.location
                ));
            }
        }
        if !self.lifetime.classes.contains_key(&self.lifetime.default_class) {
            errors.push(format!(
                "lifetime.default_class \"{}\" is not a defined class",
                self.lifetime.default_class
            ));
        }
        for (sensor, class) in &self.lifetime.sensor_classes {
            if !self.lifetime.classes.contains_key(class) {
                errors.push(format!(
                    "lifetime.sensor_classes.{sensor} references undefined class \"{class}\""
                ));
            }
        }
        if self.lifetime.assumed_readings_per_hour <= 0.0 {
            errors.push("lifetime.assumed_readings_per_hour must be positive".to_string());
        }

        let m = &self.maintenance;
        if !(0.0..=1.0).contains(&m.schedule_probability_floor) {
            errors.push(format!(
                "maintenance.schedule_probability_floor ({}) must be in [0, 1]",
                m.schedule_probability_floor
            ));
        }
        if !(0.0..=1.0).contains(&m.high_risk_threshold) {
            errors.push(format!(
                "maintenance.high_risk_threshold ({}) must be in [0, 1]",
                m.high_risk_threshold
            ));
        }
        if m.preventive_cost < 0.0 || m.corrective_cost < 0.0 || m.emergency_cost < 0.0 {
            errors.push("maintenance costs must be non-negative".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("\n")))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        RigConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_threshold_table_covers_rig() {
        let config = RigConfig::default();
        assert_eq!(config.thresholds.len(), 12);
        let ph = &config.thresholds["ph"];
        assert_eq!(ph.min, 5.5);
        assert_eq!(ph.max, 8.5);
        assert_eq!(ph.unit, "pH");
    }

    #[test]
    fn test_inverted_threshold_rejected() {
        let mut config = RigConfig::default();
        config
            .thresholds
            .insert("ph".into(), ThresholdSpec::new(9.0, 5.0, "pH", 2.0));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thresholds.ph"));
    }

    #[test]
    fn test_nonpositive_shape_rejected() {
        let mut config = RigConfig::default();
        config.lifetime.classes.insert(
            "npk_sensor".into(),
            LifetimeParameters { shape: 0.0, scale: 8760.0, location: 0.0 },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[test]
    fn test_unknown_lifetime_class_rejected() {
        let mut config = RigConfig::default();
        config
            .lifetime
            .sensor_classes
            .insert("ph".into(), "no_such_class".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no_such_class"));
    }

    #[test]
    fn test_sensor_class_mapping_is_many_to_one() {
        let lifetime = LifetimeConfig::default();
        assert_eq!(lifetime.class_for("nitrogen"), "npk_sensor");
        assert_eq!(lifetime.class_for("phosphorus"), "npk_sensor");
        assert_eq!(lifetime.class_for("water_level"), "water_level_sensor");
        assert_eq!(lifetime.class_for("water_flow"), "water_flow_sensor");
        // Unmapped sensors fall back to the default class
        assert_eq!(lifetime.class_for("mystery_channel"), "npk_sensor");
    }

    #[test]
    fn test_nitrogen_lifetime_parameters() {
        let lifetime = LifetimeConfig::default();
        let params = lifetime.params_for("nitrogen").unwrap();
        assert_eq!(params.shape, 2.5);
        assert_eq!(params.scale, 8760.0);
        assert_eq!(params.location, 0.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RigConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed: RigConfig = toml::from_str(&toml_str).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.thresholds, config.thresholds);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let parsed: RigConfig = toml::from_str(
            r#"
            [rig]
            name = "GREENHOUSE-7"

            [anomaly]
            communication_check_enabled = true
            "#,
        )
        .unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.rig.name, "GREENHOUSE-7");
        assert!(parsed.anomaly.communication_check_enabled);
        // Untouched sections keep their built-in defaults
        assert_eq!(parsed.anomaly.statistical_window, 100);
        assert_eq!(parsed.thresholds.len(), 12);
    }
}
