//! Maintenance records, the status lifecycle, and advisory recommendations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maintenance tier, ordered by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceType {
    PreventiveInspection,
    PreventiveMaintenance,
    UrgentMaintenance,
    EmergencyMaintenance,
}

impl std::fmt::Display for MaintenanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintenanceType::PreventiveInspection => write!(f, "preventive_inspection"),
            MaintenanceType::PreventiveMaintenance => write!(f, "preventive_maintenance"),
            MaintenanceType::UrgentMaintenance => write!(f, "urgent_maintenance"),
            MaintenanceType::EmergencyMaintenance => write!(f, "emergency_maintenance"),
        }
    }
}

/// Lifecycle status of a maintenance record.
///
/// Transitions are monotonic: planned → in_progress → completed, or
/// planned → cancelled. There are no reverse transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl MaintenanceStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: MaintenanceStatus) -> bool {
        matches!(
            (self, next),
            (MaintenanceStatus::Planned, MaintenanceStatus::InProgress)
                | (MaintenanceStatus::Planned, MaintenanceStatus::Cancelled)
                | (MaintenanceStatus::InProgress, MaintenanceStatus::Completed)
        )
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaintenanceStatus::Planned => write!(f, "planned"),
            MaintenanceStatus::InProgress => write!(f, "in_progress"),
            MaintenanceStatus::Completed => write!(f, "completed"),
            MaintenanceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A scheduled (or historical) maintenance intervention for one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub id: u64,
    pub sensor_name: String,
    pub maintenance_type: MaintenanceType,
    pub description: String,
    pub scheduled_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
}

/// Priority of an advisory recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationPriority {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Advisory maintenance recommendation. Purely informational: no side
/// effects, nothing persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category tag, e.g. "PREVENTIVE", "MONITORING", "REPLACEMENT"
    pub kind: String,
    pub title: String,
    pub description: String,
    pub priority: RecommendationPriority,
}

/// Maintenance counts by cost bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub preventive: usize,
    pub corrective: usize,
    pub emergency: usize,
}

/// Reporting aggregate comparing actual maintenance spend against the
/// hypothetical all-preventive baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSavingsReport {
    pub current_costs: f64,
    pub optimal_costs: f64,
    pub potential_savings: f64,
    /// Fraction of interventions that were preventive; 0.0 with no records
    pub preventive_ratio: f64,
    pub breakdown: CostBreakdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_are_monotonic() {
        use MaintenanceStatus::*;
        assert!(Planned.can_transition_to(InProgress));
        assert!(Planned.can_transition_to(Cancelled));
        assert!(InProgress.can_transition_to(Completed));

        // No reverse or skip transitions
        assert!(!InProgress.can_transition_to(Planned));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Planned));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Cancelled));
    }

    #[test]
    fn test_maintenance_type_ordering_by_urgency() {
        assert!(MaintenanceType::PreventiveInspection < MaintenanceType::PreventiveMaintenance);
        assert!(MaintenanceType::UrgentMaintenance < MaintenanceType::EmergencyMaintenance);
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_string(&MaintenanceType::UrgentMaintenance).unwrap(),
            "\"urgent_maintenance\""
        );
        assert_eq!(
            serde_json::to_string(&MaintenanceStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
