//! Advisory recommendations and maintenance cost reporting
//!
//! Pure mappings over persisted state: recommendations from the latest
//! failure probability bands, and a cost-savings aggregate over historical
//! maintenance records. Nothing here has side effects.

use tracing::debug;

use super::scheduler::MaintenanceScheduler;
use crate::storage::StorageError;
use crate::types::{
    CostBreakdown, CostSavingsReport, MaintenanceType, Recommendation, RecommendationPriority,
};

impl MaintenanceScheduler {
    /// Advisory recommendations for one sensor from its latest prediction.
    ///
    /// With no prediction on record, a single INFO entry asks for an
    /// analysis run instead of failing.
    pub fn maintenance_recommendations(
        &self,
        sensor_name: &str,
    ) -> Result<Vec<Recommendation>, StorageError> {
        let predictions = self.store().latest_predictions()?;
        let Some(prediction) = predictions.iter().find(|p| p.sensor_name == sensor_name) else {
            debug!(sensor = sensor_name, "No prediction on record, recommending analysis");
            return Ok(vec![Recommendation {
                kind: "INFO".to_string(),
                title: "Analysis required".to_string(),
                description:
                    "No prediction available for this sensor. Run a predictive analysis first."
                        .to_string(),
                priority: RecommendationPriority::Info,
            }]);
        };

        let probability = prediction.failure_probability;
        let recommendations = if probability < 0.2 {
            vec![Recommendation {
                kind: "PREVENTIVE".to_string(),
                title: "Standard preventive maintenance".to_string(),
                description: "Perform a monthly visual check and quarterly calibration."
                    .to_string(),
                priority: RecommendationPriority::Low,
            }]
        } else if probability < 0.5 {
            vec![
                Recommendation {
                    kind: "PREVENTIVE".to_string(),
                    title: "Thorough inspection recommended".to_string(),
                    description:
                        "Check connections, clean the probe, and verify measurement accuracy."
                            .to_string(),
                    priority: RecommendationPriority::Medium,
                },
                Recommendation {
                    kind: "MONITORING".to_string(),
                    title: "Reinforced monitoring".to_string(),
                    description: "Increase monitoring frequency and watch for anomalies."
                        .to_string(),
                    priority: RecommendationPriority::Medium,
                },
            ]
        } else if probability < 0.8 {
            vec![
                Recommendation {
                    kind: "URGENT".to_string(),
                    title: "Urgent maintenance required".to_string(),
                    description:
                        "Plan an intervention within 7 days and verify every component."
                            .to_string(),
                    priority: RecommendationPriority::High,
                },
                Recommendation {
                    kind: "REPLACEMENT".to_string(),
                    title: "Replacement preparation".to_string(),
                    description: "Order spare parts and prepare the sensor replacement."
                        .to_string(),
                    priority: RecommendationPriority::High,
                },
            ]
        } else {
            vec![
                Recommendation {
                    kind: "EMERGENCY".to_string(),
                    title: "Emergency intervention".to_string(),
                    description:
                        "Failure risk is imminent. Intervention required within 24 hours."
                            .to_string(),
                    priority: RecommendationPriority::Critical,
                },
                Recommendation {
                    kind: "REPLACEMENT".to_string(),
                    title: "Immediate replacement".to_string(),
                    description:
                        "Replace the sensor as soon as possible to avoid a system outage."
                            .to_string(),
                    priority: RecommendationPriority::Critical,
                },
            ]
        };

        Ok(recommendations)
    }

    /// Compare actual maintenance spend against the hypothetical
    /// all-preventive baseline. With no records at all, reports zero costs
    /// and a zero preventive ratio rather than dividing by zero.
    pub fn cost_savings(&self) -> Result<CostSavingsReport, StorageError> {
        let records = self.store().maintenance_records(None)?;

        let mut breakdown = CostBreakdown::default();
        for record in &records {
            match record.maintenance_type {
                MaintenanceType::PreventiveInspection | MaintenanceType::PreventiveMaintenance => {
                    breakdown.preventive += 1;
                }
                MaintenanceType::UrgentMaintenance => breakdown.corrective += 1,
                MaintenanceType::EmergencyMaintenance => breakdown.emergency += 1,
            }
        }

        let total = breakdown.preventive + breakdown.corrective + breakdown.emergency;
        if total == 0 {
            return Ok(CostSavingsReport {
                current_costs: 0.0,
                optimal_costs: 0.0,
                potential_savings: 0.0,
                preventive_ratio: 0.0,
                breakdown,
            });
        }

        let costs = self.config();
        let current_costs = breakdown.preventive as f64 * costs.preventive_cost
            + breakdown.corrective as f64 * costs.corrective_cost
            + breakdown.emergency as f64 * costs.emergency_cost;
        let optimal_costs = total as f64 * costs.preventive_cost;

        Ok(CostSavingsReport {
            current_costs,
            optimal_costs,
            potential_savings: (current_costs - optimal_costs).max(0.0),
            preventive_ratio: breakdown.preventive as f64 / total as f64,
            breakdown,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use crate::storage::{HistoryStore, MemoryStore};
    use crate::types::{FailurePrediction, TrendAnalysis};
    use chrono::Utc;
    use std::sync::Arc;

    fn scheduler_with_store() -> (Arc<MemoryStore>, MaintenanceScheduler) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = MaintenanceScheduler::from_rig_config(
            Arc::clone(&store) as Arc<dyn HistoryStore>,
            &RigConfig::default(),
        );
        (store, scheduler)
    }

    fn save_prediction(store: &MemoryStore, sensor: &str, probability: f64) {
        store
            .save_prediction(&FailurePrediction {
                sensor_name: sensor.to_string(),
                failure_probability: probability,
                reliability: 1.0 - probability,
                mean_time_to_failure_hours: 7000.0,
                predicted_failure_date: None,
                confidence_score: 0.7,
                degradation: TrendAnalysis::insufficient(0),
                current_age_hours: 1000.0,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn test_no_prediction_asks_for_analysis() {
        let (_store, scheduler) = scheduler_with_store();
        let recs = scheduler.maintenance_recommendations("ph").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, "INFO");
        assert_eq!(recs[0].priority, RecommendationPriority::Info);
    }

    #[test]
    fn test_recommendation_bands() {
        let (store, scheduler) = scheduler_with_store();

        save_prediction(&store, "low_risk", 0.1);
        let recs = scheduler.maintenance_recommendations("low_risk").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, RecommendationPriority::Low);

        save_prediction(&store, "medium_risk", 0.35);
        let recs = scheduler.maintenance_recommendations("medium_risk").unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().any(|r| r.kind == "MONITORING"));

        save_prediction(&store, "high_risk", 0.65);
        let recs = scheduler.maintenance_recommendations("high_risk").unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.priority == RecommendationPriority::High));

        save_prediction(&store, "critical_risk", 0.9);
        let recs = scheduler.maintenance_recommendations("critical_risk").unwrap();
        assert!(recs.iter().any(|r| r.kind == "EMERGENCY"));
        assert!(recs.iter().all(|r| r.priority == RecommendationPriority::Critical));
    }

    #[test]
    fn test_recommendations_use_latest_prediction() {
        let (store, scheduler) = scheduler_with_store();
        save_prediction(&store, "ph", 0.1);
        save_prediction(&store, "ph", 0.9);

        let recs = scheduler.maintenance_recommendations("ph").unwrap();
        assert!(recs.iter().any(|r| r.kind == "EMERGENCY"));
    }

    #[test]
    fn test_cost_savings_empty_store_reports_zero() {
        let (_store, scheduler) = scheduler_with_store();
        let report = scheduler.cost_savings().unwrap();
        assert_eq!(report.current_costs, 0.0);
        assert_eq!(report.optimal_costs, 0.0);
        assert_eq!(report.potential_savings, 0.0);
        assert_eq!(report.preventive_ratio, 0.0);
    }

    #[test]
    fn test_cost_savings_breakdown() {
        let (store, scheduler) = scheduler_with_store();
        let now = Utc::now();
        for (tier, n) in [
            (MaintenanceType::PreventiveInspection, 2),
            (MaintenanceType::PreventiveMaintenance, 1),
            (MaintenanceType::UrgentMaintenance, 2),
            (MaintenanceType::EmergencyMaintenance, 1),
        ] {
            for _ in 0..n {
                store
                    .create_maintenance_record("ph", tier, "test", now)
                    .unwrap();
            }
        }

        let report = scheduler.cost_savings().unwrap();
        assert_eq!(report.breakdown.preventive, 3);
        assert_eq!(report.breakdown.corrective, 2);
        assert_eq!(report.breakdown.emergency, 1);
        // 3·100 + 2·500 + 1·1500 = 2800 vs 6·100 = 600
        assert!((report.current_costs - 2800.0).abs() < 1e-9);
        assert!((report.optimal_costs - 600.0).abs() < 1e-9);
        assert!((report.potential_savings - 2200.0).abs() < 1e-9);
        assert!((report.preventive_ratio - 0.5).abs() < 1e-9);
    }
}
