//! WAYMARK Test Utilities
//!
//! Centralized test infrastructure for the WAYMARK workspace:
//! - Proptest generators for all entity types
//! - Mock providers for testing
//! - Test fixtures for common scenarios
//! - Custom assertions for WAYMARK-specific validation

// Re-export mock storage from its source crate
pub use waymark_storage::MockStorage;

// Re-export core types for convenience
pub use waymark_core::{
    ActivityNotifier, ApprovalDecision, ApprovalStep, CalendarDate, Deliverable,
    DeliverableStatus, DependencyEdge, DependencyError, DependencyKind, EntityType,
    LifecycleError, Milestone, MilestoneStatus, MilestoneTemplate, ProgressSnapshot,
    ProjectDirectory, StorageError, TaskSnapshot, TaskStateSource, Timestamp, ValidationError,
    WaymarkConfig, WaymarkError, WaymarkResult, days_between, new_entity_id, shift_date,
    // Entity ID aliases
    ApprovalId, DeliverableId, EdgeId, EntityId, MilestoneId, PartyId, ProjectId, SnapshotId,
    TemplateId,
};

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

// ============================================================================
// MOCK PROVIDERS
// ============================================================================

/// One alert captured by a [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAlert {
    pub recipient: PartyId,
    pub title: String,
    pub body: String,
}

/// Notifier that records every alert for later inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: RwLock<Vec<RecordedAlert>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every alert recorded so far, in send order.
    pub fn alerts(&self) -> Vec<RecordedAlert> {
        self.alerts.read().unwrap().clone()
    }

    /// Number of alerts recorded so far.
    pub fn count(&self) -> usize {
        self.alerts.read().unwrap().len()
    }

    /// Alerts sent to one recipient, in send order.
    pub fn for_recipient(&self, recipient: PartyId) -> Vec<RecordedAlert> {
        self.alerts
            .read()
            .unwrap()
            .iter()
            .filter(|alert| alert.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Discard everything recorded so far.
    pub fn clear(&self) {
        self.alerts.write().unwrap().clear();
    }
}

impl ActivityNotifier for RecordingNotifier {
    fn send_activity_alert(&self, recipient: PartyId, title: &str, body: &str) {
        self.alerts.write().unwrap().push(RecordedAlert {
            recipient,
            title: title.to_string(),
            body: body.to_string(),
        });
    }
}

/// Notifier that drops every alert.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ActivityNotifier for NullNotifier {
    fn send_activity_alert(&self, _recipient: PartyId, _title: &str, _body: &str) {}
}

/// Project directory backed by in-memory maps.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: HashMap<ProjectId, Vec<PartyId>>,
    start_dates: HashMap<ProjectId, CalendarDate>,
    allow_all: bool,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that treats every party as a member of every project.
    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            ..Self::default()
        }
    }

    pub fn with_member(mut self, project_id: ProjectId, party_id: PartyId) -> Self {
        self.members.entry(project_id).or_default().push(party_id);
        self
    }

    pub fn with_start_date(mut self, project_id: ProjectId, start: CalendarDate) -> Self {
        self.start_dates.insert(project_id, start);
        self
    }
}

impl ProjectDirectory for StaticDirectory {
    fn is_member(&self, project_id: ProjectId, party_id: PartyId) -> bool {
        self.allow_all
            || self
                .members
                .get(&project_id)
                .map(|members| members.contains(&party_id))
                .unwrap_or(false)
    }

    fn start_date(&self, project_id: ProjectId) -> Option<CalendarDate> {
        self.start_dates.get(&project_id).copied()
    }
}

/// Task source backed by a fixed map of snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticTaskSource {
    tasks: HashMap<MilestoneId, Vec<TaskSnapshot>>,
}

impl StaticTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(mut self, milestone_id: MilestoneId, tasks: Vec<TaskSnapshot>) -> Self {
        self.tasks.insert(milestone_id, tasks);
        self
    }
}

impl TaskStateSource for StaticTaskSource {
    fn tasks_for(&self, milestone_id: MilestoneId) -> Vec<TaskSnapshot> {
        self.tasks.get(&milestone_id).cloned().unwrap_or_default()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating WAYMARK entity types.

    use super::*;
    use proptest::prelude::*;

    // === Identity Type Generators ===

    /// Generate a random UUID (for generic ID generation).
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a valid UUIDv7 (timestamp-sortable).
    pub fn arb_uuid_v7() -> impl Strategy<Value = Uuid> {
        Just(()).prop_map(|_| Uuid::now_v7())
    }

    /// Generate a Timestamp (DateTime<Utc>).
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        // Generate timestamps within a reasonable range (2020-2030)
        (1577836800i64..1893456000i64)
            .prop_map(|secs| chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now))
    }

    /// Generate a CalendarDate within a reasonable range (2020-2030).
    pub fn arb_calendar_date() -> impl Strategy<Value = CalendarDate> {
        (737425i32..741078).prop_map(|days| {
            CalendarDate::from_num_days_from_ce_opt(days)
                .unwrap_or_else(|| Utc::now().date_naive())
        })
    }

    // === Enum Generators ===

    /// Generate a MilestoneStatus variant.
    pub fn arb_milestone_status() -> impl Strategy<Value = MilestoneStatus> {
        prop_oneof![
            Just(MilestoneStatus::NotStarted),
            Just(MilestoneStatus::InProgress),
            Just(MilestoneStatus::ReadyForReview),
            Just(MilestoneStatus::UnderReview),
            Just(MilestoneStatus::Completed),
            Just(MilestoneStatus::Overdue),
            Just(MilestoneStatus::Cancelled),
        ]
    }

    /// Generate a non-terminal MilestoneStatus variant.
    pub fn arb_open_milestone_status() -> impl Strategy<Value = MilestoneStatus> {
        prop_oneof![
            Just(MilestoneStatus::NotStarted),
            Just(MilestoneStatus::InProgress),
            Just(MilestoneStatus::ReadyForReview),
            Just(MilestoneStatus::UnderReview),
            Just(MilestoneStatus::Overdue),
        ]
    }

    /// Generate a DependencyKind variant.
    pub fn arb_dependency_kind() -> impl Strategy<Value = DependencyKind> {
        prop_oneof![
            Just(DependencyKind::FinishToStart),
            Just(DependencyKind::FinishToFinish),
            Just(DependencyKind::StartToStart),
            Just(DependencyKind::StartToFinish),
        ]
    }

    /// Generate an ApprovalDecision variant.
    pub fn arb_approval_decision() -> impl Strategy<Value = ApprovalDecision> {
        prop_oneof![
            Just(ApprovalDecision::Pending),
            Just(ApprovalDecision::Approved),
            Just(ApprovalDecision::Rejected),
        ]
    }

    /// Generate a DeliverableStatus variant.
    pub fn arb_deliverable_status() -> impl Strategy<Value = DeliverableStatus> {
        prop_oneof![
            Just(DeliverableStatus::Pending),
            Just(DeliverableStatus::InProgress),
            Just(DeliverableStatus::Completed),
        ]
    }

    // === Struct Generators ===

    /// Generate a Milestone for the given project.
    pub fn arb_milestone(project_id: ProjectId) -> impl Strategy<Value = Milestone> {
        (
            arb_uuid(),
            "[a-zA-Z0-9 ]{1,50}",
            arb_milestone_status(),
            arb_calendar_date(),
            0.0f64..=100.0,
            -30i64..30,
            any::<bool>(),
            arb_uuid(),
            arb_timestamp(),
        )
            .prop_map(
                move |(
                    milestone_id,
                    title,
                    status,
                    target_date,
                    completion,
                    variance_days,
                    is_critical,
                    created_by,
                    created_at,
                )| {
                    Milestone {
                        milestone_id,
                        project_id,
                        title,
                        description: None,
                        status,
                        target_date,
                        actual_completion_date: None,
                        completion,
                        variance_days,
                        is_critical,
                        requires_approval: false,
                        is_at_risk: false,
                        owner_id: None,
                        stakeholders: vec![],
                        created_by,
                        last_notified_threshold: 0.0,
                        created_at,
                        updated_at: created_at,
                        metadata: None,
                    }
                },
            )
    }

    /// Generate a DependencyEdge between two fixed milestones.
    pub fn arb_dependency_edge(
        predecessor_id: MilestoneId,
        successor_id: MilestoneId,
    ) -> impl Strategy<Value = DependencyEdge> {
        (
            arb_uuid(),
            arb_dependency_kind(),
            0u32..30,
            any::<bool>(),
            arb_timestamp(),
        )
            .prop_map(move |(edge_id, kind, lag_days, active, created_at)| DependencyEdge {
                edge_id,
                predecessor_id,
                successor_id,
                kind,
                lag_days,
                active,
                created_at,
            })
    }

    /// Generate a Deliverable under the given milestone.
    pub fn arb_deliverable(milestone_id: MilestoneId) -> impl Strategy<Value = Deliverable> {
        (
            arb_uuid(),
            "[a-zA-Z0-9 ]{1,50}",
            arb_deliverable_status(),
            0u32..20,
            arb_timestamp(),
        )
            .prop_map(
                move |(deliverable_id, title, status, sort_order, created_at)| Deliverable {
                    deliverable_id,
                    milestone_id,
                    title,
                    status,
                    sort_order,
                    completed_at: None,
                    created_at,
                },
            )
    }

    /// Generate a TaskSnapshot.
    pub fn arb_task_snapshot() -> impl Strategy<Value = TaskSnapshot> {
        (
            0.0f64..=100.0,
            prop::option::of(0.1f64..10.0),
            any::<bool>(),
        )
            .prop_map(|(percent_complete, weight, blocked)| TaskSnapshot {
                percent_complete,
                weight,
                blocked,
            })
    }

    /// Generate a valid WaymarkConfig struct.
    pub fn arb_valid_config() -> impl Strategy<Value = WaymarkConfig> {
        (
            0i64..30,
            prop::collection::btree_set(1u32..=100u32, 0..8),
        )
            .prop_map(|(at_risk_threshold_days, thresholds)| WaymarkConfig {
                at_risk_threshold_days,
                progress_thresholds: thresholds.into_iter().map(f64::from).collect(),
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    /// Create a NotStarted milestone due 30 days out.
    pub fn planned_milestone(project_id: ProjectId) -> Milestone {
        let now = Utc::now();
        Milestone::new(
            project_id,
            "test-milestone",
            now.date_naive() + chrono::Duration::days(30),
            Uuid::now_v7(),
            now,
        )
    }

    /// Create an InProgress milestone with partial completion.
    pub fn in_progress_milestone(project_id: ProjectId) -> Milestone {
        let mut milestone = planned_milestone(project_id);
        milestone.status = MilestoneStatus::InProgress;
        milestone.completion = 40.0;
        milestone
    }

    /// Create a Completed milestone with its actual date set to today.
    pub fn completed_milestone(project_id: ProjectId) -> Milestone {
        let mut milestone = planned_milestone(project_id);
        milestone.status = MilestoneStatus::Completed;
        milestone.completion = 100.0;
        milestone.actual_completion_date = Some(Utc::now().date_naive());
        milestone
    }

    /// Create a NotStarted milestone with an owner assigned.
    pub fn owned_milestone(project_id: ProjectId, owner_id: PartyId) -> Milestone {
        planned_milestone(project_id).with_owner(owner_id)
    }

    /// Create a zero-lag finish-to-start edge.
    pub fn finish_to_start_edge(
        predecessor_id: MilestoneId,
        successor_id: MilestoneId,
    ) -> DependencyEdge {
        DependencyEdge::new(
            predecessor_id,
            successor_id,
            DependencyKind::FinishToStart,
            0,
            Utc::now(),
        )
    }

    /// Create a pending approval step.
    pub fn pending_step(
        milestone_id: MilestoneId,
        step_number: u32,
        approver_id: PartyId,
    ) -> ApprovalStep {
        ApprovalStep::new(milestone_id, step_number, approver_id, Utc::now())
    }

    /// Create a pending deliverable.
    pub fn pending_deliverable(milestone_id: MilestoneId, sort_order: u32) -> Deliverable {
        Deliverable::new(
            milestone_id,
            &format!("deliverable-{}", sort_order),
            sort_order,
            Utc::now(),
        )
    }

    /// Create a completed deliverable.
    pub fn completed_deliverable(milestone_id: MilestoneId, sort_order: u32) -> Deliverable {
        let mut deliverable = pending_deliverable(milestone_id, sort_order);
        deliverable.complete(Utc::now());
        deliverable
    }

    /// Task set averaging to 50 percent complete.
    pub fn half_done_tasks() -> Vec<TaskSnapshot> {
        vec![TaskSnapshot::new(100.0), TaskSnapshot::new(0.0)]
    }

    /// Task set where every task is complete.
    pub fn all_done_tasks() -> Vec<TaskSnapshot> {
        vec![TaskSnapshot::new(100.0), TaskSnapshot::new(100.0)]
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for WAYMARK-specific validation.

    use super::*;

    /// Assert that a WaymarkResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a WaymarkResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Assert that a WaymarkResult is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(
        result: &WaymarkResult<T>,
        entity_type: EntityType,
    ) {
        match result {
            Err(WaymarkError::Storage(StorageError::NotFound { entity_type: et, .. })) => {
                assert_eq!(*et, entity_type, "Wrong entity type in NotFound error");
            }
            other => panic!(
                "Expected NotFound error for {:?}, got: {:?}",
                entity_type, other
            ),
        }
    }

    /// Assert that a WaymarkResult is a Dependency error.
    #[track_caller]
    pub fn assert_dependency_error<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        match result {
            Err(WaymarkError::Dependency(_)) => {}
            other => panic!("Expected Dependency error, got: {:?}", other),
        }
    }

    /// Assert that a WaymarkResult is a CycleDetected dependency error.
    #[track_caller]
    pub fn assert_cycle_detected<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        match result {
            Err(WaymarkError::Dependency(DependencyError::CycleDetected { .. })) => {}
            other => panic!("Expected CycleDetected error, got: {:?}", other),
        }
    }

    /// Assert that a WaymarkResult is an InvalidTransition lifecycle error
    /// with the expected endpoints.
    #[track_caller]
    pub fn assert_invalid_transition<T: std::fmt::Debug>(
        result: &WaymarkResult<T>,
        from: MilestoneStatus,
        to: MilestoneStatus,
    ) {
        match result {
            Err(WaymarkError::Lifecycle(LifecycleError::InvalidTransition { from: f, to: t })) => {
                assert_eq!(*f, from, "Wrong from-status in InvalidTransition error");
                assert_eq!(*t, to, "Wrong to-status in InvalidTransition error");
            }
            other => panic!(
                "Expected InvalidTransition({} -> {}), got: {:?}",
                from, to, other
            ),
        }
    }

    /// Assert that a WaymarkResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        match result {
            Err(WaymarkError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a WaymarkResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &WaymarkResult<T>) {
        match result {
            Err(WaymarkError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a milestone has the expected status.
    #[track_caller]
    pub fn assert_milestone_status(milestone: &Milestone, expected: MilestoneStatus) {
        assert_eq!(
            milestone.status, expected,
            "Milestone status mismatch: expected {:?}, got {:?}",
            expected, milestone.status
        );
    }

    /// Assert that the notifier recorded an alert with the given title for
    /// the given recipient.
    #[track_caller]
    pub fn assert_alerted(notifier: &RecordingNotifier, recipient: PartyId, title: &str) {
        let alerts = notifier.alerts();
        assert!(
            alerts
                .iter()
                .any(|alert| alert.recipient == recipient && alert.title == title),
            "No \"{}\" alert for {}; recorded: {:?}",
            title,
            recipient,
            alerts
        );
    }

    /// Assert that the notifier recorded nothing.
    #[track_caller]
    pub fn assert_no_alerts(notifier: &RecordingNotifier) {
        let alerts = notifier.alerts();
        assert!(alerts.is_empty(), "Expected no alerts, recorded: {:?}", alerts);
    }

    /// Assert that a WaymarkConfig is valid.
    #[track_caller]
    pub fn assert_config_valid(config: &WaymarkConfig) {
        match config.validate() {
            Ok(()) => {}
            Err(e) => panic!("Config validation failed: {:?}", e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
