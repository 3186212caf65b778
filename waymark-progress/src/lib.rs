//! WAYMARK Progress - Completion and Schedule Projection
//!
//! Projects child task state onto milestones: weighted completion,
//! schedule variance against the planned window, at-risk flagging, the
//! automatic Overdue transition, watermarked threshold alerts, and an
//! immutable snapshot appended on every recompute.

use std::sync::Arc;
use tracing::debug;
use waymark_core::{
    ActivityNotifier, CalendarDate, EntityType, Milestone, MilestoneId, MilestoneStatus,
    ProgressSnapshot, ProjectDirectory, SnapshotId, StorageError, TaskSnapshot, TaskStateSource,
    Timestamp, WaymarkConfig, WaymarkError, WaymarkResult, days_between,
};
use waymark_storage::{MilestoneUpdate, StorageTrait};

// ============================================================================
// PROGRESS MATH
// ============================================================================

/// Weighted mean of task completion, clamped to [0, 100] and rounded to two
/// decimals. Unweighted tasks count as weight 1. With no tasks, or no
/// positive total weight, the milestone's stored completion is returned
/// unchanged: absence of task data is not evidence of zero progress.
pub fn progress_from_tasks(milestone: &Milestone, tasks: &[TaskSnapshot]) -> f64 {
    if tasks.is_empty() {
        return milestone.completion;
    }
    let total_weight: f64 = tasks.iter().map(TaskSnapshot::effective_weight).sum();
    if total_weight <= 0.0 {
        return milestone.completion;
    }
    let weighted_sum: f64 = tasks
        .iter()
        .map(|t| t.percent_complete * t.effective_weight())
        .sum();
    let mean = weighted_sum / total_weight;
    (mean.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Signed schedule variance in days as of the given date; negative means
/// behind.
///
/// The planned window runs from the project start date (falling back to the
/// milestone's creation date when the project has none) to the target date,
/// floored at one day. Expected completion is the elapsed share of that
/// window capped at 100, with elapsed floored at zero, and the percentage
/// gap converts back into days through the window length.
pub fn schedule_variance_days(
    milestone: &Milestone,
    project_start: Option<CalendarDate>,
    as_of: CalendarDate,
) -> i64 {
    let start = project_start.unwrap_or_else(|| milestone.created_at.date_naive());
    let planned_days = days_between(start, milestone.target_date).max(1);
    let elapsed_days = days_between(start, as_of).max(0);
    let expected = (elapsed_days as f64 / planned_days as f64 * 100.0).min(100.0);
    ((milestone.completion - expected) * planned_days as f64 / 100.0).round() as i64
}

// ============================================================================
// PROGRESS UPDATE
// ============================================================================

/// Outcome of one recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub completion: f64,
    pub variance_days: i64,
    pub is_at_risk: bool,
    /// Whether this recompute moved the milestone into Overdue
    pub became_overdue: bool,
    /// Thresholds newly crossed and alerted, ascending
    pub thresholds_notified: Vec<f64>,
    pub snapshot_id: SnapshotId,
}

// ============================================================================
// PROGRESS PROJECTOR
// ============================================================================

/// Projects task state into milestone progress over the shared store.
pub struct ProgressProjector {
    storage: Arc<dyn StorageTrait>,
    config: WaymarkConfig,
}

impl ProgressProjector {
    /// Create a projector. The configuration is validated up front so a bad
    /// threshold list fails here rather than mid-recompute.
    pub fn new(storage: Arc<dyn StorageTrait>, config: WaymarkConfig) -> WaymarkResult<Self> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &WaymarkConfig {
        &self.config
    }

    /// Recompute one milestone's progress from its current task state.
    ///
    /// Completion comes from `progress_from_tasks`, variance from
    /// `schedule_variance_days` with the project start date as baseline.
    /// The at-risk flag is set when variance is strictly more negative than
    /// the configured threshold. A non-terminal milestone whose target date
    /// has passed with completion below 100 moves to Overdue. Each
    /// configured threshold at or below the new completion and above the
    /// stored watermark is alerted to every recipient, once ever; alerts go
    /// out before anything is persisted. One immutable snapshot is appended
    /// regardless of what changed.
    pub fn update_from_tasks(
        &self,
        milestone_id: MilestoneId,
        tasks_source: &dyn TaskStateSource,
        directory: &dyn ProjectDirectory,
        notifier: &dyn ActivityNotifier,
        today: CalendarDate,
        now: Timestamp,
    ) -> WaymarkResult<ProgressUpdate> {
        let mut milestone = self.storage.milestone_get(milestone_id)?.ok_or(
            WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id: milestone_id,
            }),
        )?;

        let tasks = tasks_source.tasks_for(milestone_id);
        milestone.completion = progress_from_tasks(&milestone, &tasks);
        let project_start = directory.start_date(milestone.project_id);
        let variance_days = schedule_variance_days(&milestone, project_start, today);
        let is_at_risk = variance_days < -self.config.at_risk_threshold_days;
        let became_overdue =
            milestone.status != MilestoneStatus::Overdue && milestone.is_overdue(today);

        let crossed: Vec<f64> = self
            .config
            .progress_thresholds
            .iter()
            .copied()
            .filter(|t| milestone.completion >= *t && *t > milestone.last_notified_threshold)
            .collect();

        // Alerts fire before any write lands.
        for threshold in &crossed {
            for recipient in milestone.recipients() {
                notifier.send_activity_alert(
                    recipient,
                    "Milestone progress",
                    &format!(
                        "\"{}\" reached {}% completion",
                        milestone.title, threshold
                    ),
                );
            }
        }

        let mut update = MilestoneUpdate {
            completion: Some(milestone.completion),
            variance_days: Some(variance_days),
            is_at_risk: Some(is_at_risk),
            updated_at: Some(now),
            ..Default::default()
        };
        if became_overdue {
            update.status = Some(MilestoneStatus::Overdue);
        }
        if let Some(&highest) = crossed.last() {
            update.last_notified_threshold = Some(highest);
        }
        self.storage.milestone_update(milestone_id, update)?;

        let snapshot = ProgressSnapshot::new(
            milestone_id,
            milestone.completion,
            variance_days,
            tasks.iter().filter(|t| t.is_remaining()).count() as u32,
            tasks.iter().filter(|t| t.blocked).count() as u32,
            now,
        );
        self.storage.snapshot_append(&snapshot)?;

        debug!(
            "Recomputed progress for '{}': {}% complete, variance {} day(s)",
            milestone.title, milestone.completion, variance_days
        );

        Ok(ProgressUpdate {
            completion: milestone.completion,
            variance_days,
            is_at_risk,
            became_overdue,
            thresholds_notified: crossed,
            snapshot_id: snapshot.snapshot_id,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;
    use waymark_core::ConfigError;
    use waymark_storage::MockStorage;
    use waymark_test_utils::{
        assertions, NullNotifier, RecordingNotifier, StaticDirectory, StaticTaskSource,
    };

    fn test_now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (Arc<MockStorage>, ProgressProjector) {
        let storage = Arc::new(MockStorage::new());
        let projector =
            ProgressProjector::new(storage.clone(), WaymarkConfig::default()).unwrap();
        (storage, projector)
    }

    fn seed_milestone(storage: &MockStorage, target: CalendarDate) -> Milestone {
        let milestone =
            Milestone::new(Uuid::now_v7(), "Fit-out", target, Uuid::now_v7(), test_now());
        storage.milestone_insert(&milestone).unwrap();
        milestone
    }

    // === Pure math ===

    #[test]
    fn test_progress_weighted_mean_rounds_to_two_decimals() {
        let milestone = seed_milestone(&MockStorage::new(), date(2024, 7, 1));
        let tasks = vec![
            TaskSnapshot::new(100.0).with_weight(2.0),
            TaskSnapshot::new(0.0),
        ];
        assert_eq!(progress_from_tasks(&milestone, &tasks), 66.67);
    }

    #[test]
    fn test_progress_unweighted_tasks_average_evenly() {
        let milestone = seed_milestone(&MockStorage::new(), date(2024, 7, 1));
        let tasks = vec![TaskSnapshot::new(100.0), TaskSnapshot::new(0.0)];
        assert_eq!(progress_from_tasks(&milestone, &tasks), 50.0);
    }

    #[test]
    fn test_progress_without_tasks_keeps_stored_completion() {
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 7, 1));
        milestone.completion = 42.5;
        assert_eq!(progress_from_tasks(&milestone, &[]), 42.5);
    }

    #[test]
    fn test_progress_zero_total_weight_keeps_stored_completion() {
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 7, 1));
        milestone.completion = 30.0;
        let tasks = vec![TaskSnapshot::new(100.0).with_weight(0.0)];
        assert_eq!(progress_from_tasks(&milestone, &tasks), 30.0);
    }

    #[test]
    fn test_progress_clamps_out_of_range_input() {
        let milestone = seed_milestone(&MockStorage::new(), date(2024, 7, 1));
        assert_eq!(
            progress_from_tasks(&milestone, &[TaskSnapshot::new(150.0)]),
            100.0
        );
        assert_eq!(
            progress_from_tasks(&milestone, &[TaskSnapshot::new(-10.0)]),
            0.0
        );
    }

    #[test]
    fn test_variance_behind_ahead_and_on_track() {
        // Ten-day window, five days in: expected completion is 50%.
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 6, 11));
        let start = Some(date(2024, 6, 1));
        let as_of = date(2024, 6, 6);

        milestone.completion = 20.0;
        assert_eq!(schedule_variance_days(&milestone, start, as_of), -3);
        milestone.completion = 80.0;
        assert_eq!(schedule_variance_days(&milestone, start, as_of), 3);
        milestone.completion = 50.0;
        assert_eq!(schedule_variance_days(&milestone, start, as_of), 0);
    }

    #[test]
    fn test_variance_expected_capped_past_target() {
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 6, 11));
        milestone.completion = 0.0;
        // Far past the window: expected saturates at 100%, so the deficit
        // is the whole planned window.
        assert_eq!(
            schedule_variance_days(&milestone, Some(date(2024, 6, 1)), date(2024, 9, 1)),
            -10
        );
    }

    #[test]
    fn test_variance_planned_window_floored_at_one_day() {
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 6, 1));
        milestone.completion = 0.0;
        assert_eq!(
            schedule_variance_days(&milestone, Some(date(2024, 6, 1)), date(2024, 6, 5)),
            -1
        );
    }

    #[test]
    fn test_variance_elapsed_floored_before_start() {
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 6, 11));
        milestone.completion = 50.0;
        // Checked before the window opens: nothing expected yet.
        assert_eq!(
            schedule_variance_days(&milestone, Some(date(2024, 6, 1)), date(2024, 5, 20)),
            5
        );
    }

    #[test]
    fn test_variance_falls_back_to_creation_date() {
        // Created 2024-06-01 (test_now), no project start recorded.
        let mut milestone = seed_milestone(&MockStorage::new(), date(2024, 6, 11));
        milestone.completion = 50.0;
        assert_eq!(schedule_variance_days(&milestone, None, date(2024, 6, 6)), 0);
    }

    // === Constructor ===

    #[test]
    fn test_new_rejects_non_ascending_thresholds() {
        let storage = Arc::new(MockStorage::new());
        let config = WaymarkConfig {
            progress_thresholds: vec![50.0, 25.0],
            ..WaymarkConfig::default()
        };
        let result = ProgressProjector::new(storage, config);
        assert!(matches!(
            result,
            Err(WaymarkError::Config(ConfigError::NotAscending { .. }))
        ));
    }

    // === update_from_tasks ===

    #[test]
    fn test_update_persists_completion_variance_and_snapshot() {
        let (storage, projector) = setup();
        let milestone = seed_milestone(&storage, date(2024, 6, 11));
        let source = StaticTaskSource::new().with_tasks(
            milestone.milestone_id,
            vec![TaskSnapshot::new(100.0), TaskSnapshot::new(0.0).with_blocked(true)],
        );
        let directory =
            StaticDirectory::new().with_start_date(milestone.project_id, date(2024, 6, 1));

        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &NullNotifier,
                date(2024, 6, 6),
                test_now(),
            )
            .unwrap();

        assert_eq!(update.completion, 50.0);
        assert_eq!(update.variance_days, 0);
        assert!(!update.is_at_risk);
        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert_eq!(stored.completion, 50.0);
        assert_eq!(stored.variance_days, 0);

        let snapshots = storage
            .snapshot_list_by_milestone(milestone.milestone_id)
            .unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].snapshot_id, update.snapshot_id);
        assert_eq!(snapshots[0].completion, 50.0);
        assert_eq!(snapshots[0].remaining_tasks, 1);
        assert_eq!(snapshots[0].blocked_tasks, 1);
    }

    #[test]
    fn test_update_without_tasks_still_appends_snapshot() {
        let (storage, projector) = setup();
        let milestone = seed_milestone(&storage, date(2024, 7, 1));
        storage
            .milestone_update(
                milestone.milestone_id,
                MilestoneUpdate {
                    completion: Some(35.0),
                    ..Default::default()
                },
            )
            .unwrap();

        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &StaticTaskSource::new(),
                &StaticDirectory::new(),
                &NullNotifier,
                date(2024, 6, 2),
                test_now(),
            )
            .unwrap();

        assert_eq!(update.completion, 35.0);
        assert_eq!(
            storage
                .snapshot_list_by_milestone(milestone.milestone_id)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_update_missing_milestone_not_found() {
        let (_storage, projector) = setup();
        let result = projector.update_from_tasks(
            Uuid::now_v7(),
            &StaticTaskSource::new(),
            &StaticDirectory::new(),
            &NullNotifier,
            date(2024, 6, 1),
            test_now(),
        );
        assertions::assert_not_found(&result, EntityType::Milestone);
    }

    #[test]
    fn test_update_threshold_alerts_fire_once_per_threshold() {
        let (storage, projector) = setup();
        let owner = Uuid::now_v7();
        let milestone = seed_milestone(&storage, date(2024, 12, 1));
        storage
            .milestone_update(
                milestone.milestone_id,
                MilestoneUpdate {
                    owner_id: Some(owner),
                    ..Default::default()
                },
            )
            .unwrap();
        let directory = StaticDirectory::new();
        let notifier = RecordingNotifier::new();

        // 60% crosses 25 and 50 in one recompute.
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(60.0)]);
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &notifier,
                date(2024, 6, 2),
                test_now(),
            )
            .unwrap();
        assert_eq!(update.thresholds_notified, vec![25.0, 50.0]);
        assert_eq!(notifier.for_recipient(owner).len(), 2);

        // Same completion again: watermark holds, nothing new.
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &notifier,
                date(2024, 6, 3),
                test_now(),
            )
            .unwrap();
        assert!(update.thresholds_notified.is_empty());
        assert_eq!(notifier.for_recipient(owner).len(), 2);

        // 80% crosses only the 75 mark.
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(80.0)]);
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &notifier,
                date(2024, 6, 4),
                test_now(),
            )
            .unwrap();
        assert_eq!(update.thresholds_notified, vec![75.0]);
        let bodies: Vec<String> = notifier
            .for_recipient(owner)
            .iter()
            .map(|a| a.body.clone())
            .collect();
        assert!(bodies[2].contains("reached 75% completion"));

        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert_eq!(stored.last_notified_threshold, 75.0);
    }

    #[test]
    fn test_update_threshold_alerts_reach_owner_and_stakeholders() {
        let (storage, projector) = setup();
        let owner = Uuid::now_v7();
        let stakeholder = Uuid::now_v7();
        let milestone = Milestone::new(
            Uuid::now_v7(),
            "Fit-out",
            date(2024, 12, 1),
            Uuid::now_v7(),
            test_now(),
        )
        .with_owner(owner)
        .with_stakeholders(vec![stakeholder]);
        storage.milestone_insert(&milestone).unwrap();
        let notifier = RecordingNotifier::new();
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(30.0)]);

        projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &StaticDirectory::new(),
                &notifier,
                date(2024, 6, 2),
                test_now(),
            )
            .unwrap();

        assertions::assert_alerted(&notifier, owner, "Milestone progress");
        assertions::assert_alerted(&notifier, stakeholder, "Milestone progress");
        assert_eq!(notifier.count(), 2);
    }

    #[test]
    fn test_update_at_risk_boundary_is_strict() {
        let (storage, projector) = setup();
        let directory = StaticDirectory::new();

        // Ten-day window, five days in, 20% done: variance -3 with the
        // default threshold of 3 stays inside the line.
        let milestone = seed_milestone(&storage, date(2024, 6, 11));
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(20.0)]);
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &NullNotifier,
                date(2024, 6, 6),
                test_now(),
            )
            .unwrap();
        assert_eq!(update.variance_days, -3);
        assert!(!update.is_at_risk);

        // 10% done makes it -4: now at risk.
        let milestone = seed_milestone(&storage, date(2024, 6, 11));
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(10.0)]);
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &directory,
                &NullNotifier,
                date(2024, 6, 6),
                test_now(),
            )
            .unwrap();
        assert_eq!(update.variance_days, -4);
        assert!(update.is_at_risk);
        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert!(stored.is_at_risk);
    }

    #[test]
    fn test_update_auto_overdue_once() {
        let (storage, projector) = setup();
        let milestone = seed_milestone(&storage, date(2024, 6, 10));
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(40.0)]);

        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &StaticDirectory::new(),
                &NullNotifier,
                date(2024, 6, 20),
                test_now(),
            )
            .unwrap();
        assert!(update.became_overdue);
        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert_eq!(stored.status, MilestoneStatus::Overdue);

        // Already Overdue: flagged work does not "become" overdue again.
        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &StaticDirectory::new(),
                &NullNotifier,
                date(2024, 6, 21),
                test_now(),
            )
            .unwrap();
        assert!(!update.became_overdue);
    }

    #[test]
    fn test_update_full_completion_is_never_overdue() {
        let (storage, projector) = setup();
        let milestone = seed_milestone(&storage, date(2024, 6, 10));
        let source = StaticTaskSource::new()
            .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(100.0)]);

        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &source,
                &StaticDirectory::new(),
                &NullNotifier,
                date(2024, 6, 20),
                test_now(),
            )
            .unwrap();

        assert!(!update.became_overdue);
        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert_eq!(stored.status, MilestoneStatus::NotStarted);
    }

    #[test]
    fn test_update_terminal_milestone_keeps_status_but_snapshots() {
        let (storage, projector) = setup();
        let milestone = seed_milestone(&storage, date(2024, 6, 10));
        storage
            .milestone_update(
                milestone.milestone_id,
                MilestoneUpdate {
                    status: Some(MilestoneStatus::Cancelled),
                    ..Default::default()
                },
            )
            .unwrap();

        let update = projector
            .update_from_tasks(
                milestone.milestone_id,
                &StaticTaskSource::new()
                    .with_tasks(milestone.milestone_id, vec![TaskSnapshot::new(10.0)]),
                &StaticDirectory::new(),
                &NullNotifier,
                date(2024, 6, 20),
                test_now(),
            )
            .unwrap();

        assert!(!update.became_overdue);
        let stored = storage.milestone_get(milestone.milestone_id).unwrap().unwrap();
        assert_eq!(stored.status, MilestoneStatus::Cancelled);
        assert_eq!(
            storage
                .snapshot_list_by_milestone(milestone.milestone_id)
                .unwrap()
                .len(),
            1
        );
    }
}
