//! End-to-end tests over the analytical core: anomaly classification,
//! reliability estimation, and maintenance scheduling wired together
//! through the in-memory history store.

use chrono::{Duration, Utc};
use std::sync::Arc;

use fertisense::config::RigConfig;
use fertisense::maintenance::MaintenanceScheduler;
use fertisense::reliability::ReliabilityEstimator;
use fertisense::storage::{HistoryStore, MemoryStore};
use fertisense::types::{
    AnomalyKind, DegradationTrend, MaintenanceStatus, MaintenanceType, SensorReading, Severity,
};
use fertisense::AnomalyEngine;

/// Seed `count` readings for one sensor, oldest `span_hours` ago, with a
/// value function over the chronological index.
fn seed(store: &MemoryStore, sensor: &str, unit: &str, count: usize, span_hours: f64, value: impl Fn(usize) -> f64) {
    let now = Utc::now();
    for i in 0..count {
        let hours_ago = span_hours * (count - i) as f64 / count as f64;
        let ts = now - Duration::seconds((hours_ago * 3600.0) as i64);
        store
            .insert_reading(&SensorReading::new(sensor, value(i), unit, ts))
            .unwrap();
    }
}

fn core() -> (Arc<MemoryStore>, AnomalyEngine, ReliabilityEstimator, MaintenanceScheduler) {
    let store = Arc::new(MemoryStore::new());
    let rig = RigConfig::default();
    let dyn_store = Arc::clone(&store) as Arc<dyn HistoryStore>;
    let engine = AnomalyEngine::from_rig_config(Arc::clone(&dyn_store), &rig);
    let estimator = ReliabilityEstimator::from_rig_config(Arc::clone(&dyn_store), &rig).unwrap();
    let scheduler = MaintenanceScheduler::from_rig_config(dyn_store, &rig);
    (store, engine, estimator, scheduler)
}

#[test]
fn ph_threshold_breach_yields_exactly_one_event() {
    let (store, engine, _, _) = core();

    let reading = SensorReading::new("ph", 9.5, "pH", Utc::now());
    let events = engine.detect_all(&reading).unwrap();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert!(matches!(
        event.kind,
        AnomalyKind::ThresholdHigh { value, limit, .. } if value == 9.5 && limit == 8.5
    ));
    assert!(event.message.contains("9.5"));
    assert!(event.message.contains("8.5"));

    // Persisting the event is the caller's decision
    let id = store.create_alert(event).unwrap();
    let alerts = store.recent_alerts(10).unwrap();
    assert_eq!(alerts[0].id, id);
    assert_eq!(alerts[0].alert_type, "threshold_high");
}

#[test]
fn flat_history_never_divides_by_zero() {
    let (store, engine, _, _) = core();
    seed(&store, "conductivity", "µS/cm", 50, 2.0, |_| 1200.0);

    // In-bounds probe against a zero-variance window: no statistical event
    let events = engine
        .detect_all(&SensorReading::new("conductivity", 1900.0, "µS/cm", Utc::now()))
        .unwrap();
    assert!(
        !events.iter().any(|e| matches!(e.kind, AnomalyKind::Statistical { .. })),
        "zero-variance window must suppress the statistical check"
    );
}

#[test]
fn statistical_and_threshold_checks_union() {
    let (store, engine, _, _) = core();
    // Window mean 1000, population std 100
    seed(&store, "conductivity", "µS/cm", 100, 2.0, |i| {
        if i % 2 == 0 { 900.0 } else { 1100.0 }
    });

    // 2500 µS/cm: above the 2000 max AND z = 15 against the window
    let events = engine
        .detect_all(&SensorReading::new("conductivity", 2500.0, "µS/cm", Utc::now()))
        .unwrap();

    assert!(events.iter().any(|e| matches!(e.kind, AnomalyKind::ThresholdHigh { .. })));
    assert!(events.iter().any(|e| matches!(e.kind, AnomalyKind::Statistical { .. })));
}

#[test]
fn physically_impossible_reading_is_critical_without_history() {
    let (_store, engine, _, _) = core();

    let events = engine
        .detect_all(&SensorReading::new("humidity", 130.0, "%", Utc::now()))
        .unwrap();

    let calibration = events
        .iter()
        .find(|e| matches!(e.kind, AnomalyKind::Calibration { .. }))
        .expect("calibration event");
    assert_eq!(calibration.severity, Severity::Critical);
}

#[test]
fn nitrogen_at_characteristic_life_matches_weibull_cdf() {
    let (store, _, estimator, _) = core();
    seed(&store, "nitrogen", "mg/kg", 250, 8760.0, |_| 500.0);

    let prediction = estimator.predict("nitrogen").unwrap();

    // age ≈ scale = 8760 h, shape 2.5: CDF = 1 − exp(−1) ≈ 0.6321
    assert!(
        (prediction.failure_probability - 0.6321).abs() < 0.001,
        "p = {}",
        prediction.failure_probability
    );
    assert!((prediction.reliability - (1.0 - prediction.failure_probability)).abs() < 1e-12);

    // MTTF = 8760·Γ(1 + 1/2.5) ≈ 7772 h
    assert!(
        (prediction.mean_time_to_failure_hours - 8760.0 * 0.887_263_8).abs() < 1.0,
        "mttf = {}",
        prediction.mean_time_to_failure_hours
    );

    // 250 readings: high confidence
    assert!((prediction.confidence_score - 0.9).abs() < 1e-9);
}

#[test]
fn sensor_without_history_reads_as_newly_installed() {
    let (_store, _, estimator, _) = core();

    assert_eq!(estimator.estimate_sensor_age("water_flow").unwrap(), 0.0);

    let prediction = estimator.predict("water_flow").unwrap();
    assert_eq!(prediction.failure_probability, 0.0);
    assert!((prediction.confidence_score - 0.1).abs() < 1e-9);
    assert_eq!(prediction.degradation.trend, DegradationTrend::InsufficientData);
}

#[test]
fn linear_decay_is_degrading_with_full_confidence() {
    let (store, _, estimator, _) = core();
    seed(&store, "nitrogen", "mg/kg", 100, 100.0, |i| 800.0 - i as f64);

    let analysis = estimator.analyze_degradation_trend("nitrogen").unwrap();
    assert_eq!(analysis.trend, DegradationTrend::Degrading);
    assert!(
        (analysis.trend_confidence - 1.0).abs() < 1e-6,
        "confidence = {}",
        analysis.trend_confidence
    );
}

#[test]
fn analysis_run_schedules_and_dedups() {
    let (store, _, estimator, scheduler) = core();

    // One year of nitrogen history: p ≈ 0.63, urgent tier, high risk
    seed(&store, "nitrogen", "mg/kg", 250, 8760.0, |_| 500.0);

    let first = estimator.run_analysis(&scheduler);
    assert_eq!(first.sensors_analyzed, 1, "only nitrogen has history");
    assert_eq!(first.maintenances_scheduled, 1);
    assert_eq!(first.high_risk_sensors, vec!["nitrogen".to_string()]);
    assert!(first.failures.is_empty());

    let records = store.maintenance_records(Some(MaintenanceStatus::Planned)).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].maintenance_type, MaintenanceType::UrgentMaintenance);
    assert!(records[0].description.contains('%'));

    // Predictions are persisted and visible as "latest"
    let latest = store.latest_predictions().unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].sensor_name, "nitrogen");

    // A second run supersedes the prediction but creates no duplicate record
    let second = estimator.run_analysis(&scheduler);
    assert_eq!(second.maintenances_scheduled, 0, "planned record must dedup");
    assert_eq!(
        store.maintenance_records(Some(MaintenanceStatus::Planned)).unwrap().len(),
        1
    );
}

#[test]
fn recommendations_follow_the_latest_prediction() {
    let (store, _, estimator, scheduler) = core();

    // No prediction yet: a single "run analysis" advisory
    let recs = scheduler.maintenance_recommendations("nitrogen").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].kind, "INFO");

    seed(&store, "nitrogen", "mg/kg", 250, 8760.0, |_| 500.0);
    estimator.run_analysis(&scheduler);

    // p ≈ 0.63 lands in the urgent band
    let recs = scheduler.maintenance_recommendations("nitrogen").unwrap();
    assert!(recs.iter().any(|r| r.kind == "URGENT"));
    assert!(recs.iter().any(|r| r.kind == "REPLACEMENT"));
}

#[test]
fn maintenance_record_lifecycle_is_monotonic() {
    let (store, _, estimator, scheduler) = core();
    seed(&store, "nitrogen", "mg/kg", 250, 8760.0, |_| 500.0);
    estimator.run_analysis(&scheduler);

    let record = store.maintenance_records(None).unwrap().remove(0);
    store
        .update_maintenance_status(record.id, MaintenanceStatus::InProgress, None)
        .unwrap();
    store
        .update_maintenance_status(record.id, MaintenanceStatus::Completed, Some(Utc::now()))
        .unwrap();

    // Once completed, the record can never be re-planned
    assert!(store
        .update_maintenance_status(record.id, MaintenanceStatus::Planned, None)
        .is_err());
}

#[test]
fn cost_report_reflects_scheduled_maintenance() {
    let (store, _, estimator, scheduler) = core();
    seed(&store, "nitrogen", "mg/kg", 250, 8760.0, |_| 500.0);
    estimator.run_analysis(&scheduler);

    let report = scheduler.cost_savings().unwrap();
    assert_eq!(report.breakdown.corrective, 1);
    assert!((report.current_costs - 500.0).abs() < 1e-9);
    assert!((report.potential_savings - 400.0).abs() < 1e-9);
}

#[test]
fn correlation_batch_flags_implausible_joint_state() {
    let (_store, engine, _, _) = core();

    let now = Utc::now();
    let batch = [
        SensorReading::new("temperature", 33.0, "°C", now),
        SensorReading::new("humidity", 88.0, "%", now),
        SensorReading::new("ph", 7.0, "pH", now),
    ];
    let events = engine.detect_correlation_anomalies(&batch);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sensor_name, "temperature_humidity");
}
