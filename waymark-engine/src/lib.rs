//! WAYMARK Engine - Dependency Graph Operations
//!
//! Maintains the cycle-free dependency graph between milestones, answers
//! readiness queries, and propagates target-date slips to dependents.
//!
//! Cycle detection runs at edge-creation time; cascades still carry a
//! visited set so a cycle in stored data cannot hang a walk. Cascade
//! direction is strictly "later pushes later": an earlier date is never
//! propagated.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};
use waymark_core::{
    ActivityNotifier, CalendarDate, DependencyEdge, DependencyError, DependencyKind, EntityType,
    MilestoneId, MilestoneStatus, StorageError, Timestamp, WaymarkError, WaymarkResult,
    days_between, shift_date,
};
use waymark_storage::{MilestoneUpdate, StorageTrait};

// ============================================================================
// QUERY RESULT TYPES
// ============================================================================

/// Why one dependency is holding a milestone back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Finish-type dependency whose predecessor has not completed
    PredecessorNotCompleted,
    /// Start-type dependency whose predecessor has not begun
    PredecessorNotStarted,
    /// Status rule satisfied, but the lag window is still open
    LagNotElapsed { available_on: CalendarDate },
}

/// One unsatisfied dependency blocking a milestone from starting.
#[derive(Debug, Clone)]
pub struct Blocker {
    pub edge: DependencyEdge,
    pub predecessor_id: MilestoneId,
    pub predecessor_status: MilestoneStatus,
    pub reason: BlockReason,
}

/// One milestone shifted by a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftedMilestone {
    pub milestone_id: MilestoneId,
    pub previous_target: CalendarDate,
    pub new_target: CalendarDate,
}

/// Outcome of one cascade walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Signed day count the root moved; cascades only run when positive
    pub delta_days: i64,
    /// Milestones shifted, in visit order
    pub shifted: Vec<ShiftedMilestone>,
    /// Terminal successors left untouched
    pub skipped_terminal: Vec<MilestoneId>,
}

impl CascadeReport {
    fn no_op(delta_days: i64) -> Self {
        Self {
            delta_days,
            shifted: Vec::new(),
            skipped_terminal: Vec::new(),
        }
    }

    /// True when the cascade moved nothing.
    pub fn is_empty(&self) -> bool {
        self.shifted.is_empty() && self.skipped_terminal.is_empty()
    }
}

// ============================================================================
// DEPENDENCY ENGINE
// ============================================================================

/// Graph operations over the milestone dependency store.
pub struct DependencyEngine {
    storage: Arc<dyn StorageTrait>,
}

impl DependencyEngine {
    /// Create an engine over the given storage.
    pub fn new(storage: Arc<dyn StorageTrait>) -> Self {
        Self { storage }
    }

    /// Create a new active dependency edge.
    ///
    /// Rejects self-dependencies, edges whose endpoints do not resolve,
    /// duplicate active edges with the same kind, and any edge that would
    /// close a cycle over the active-edge graph. Nothing is persisted on
    /// rejection.
    pub fn create_dependency(
        &self,
        predecessor_id: MilestoneId,
        successor_id: MilestoneId,
        kind: DependencyKind,
        lag_days: u32,
        now: Timestamp,
    ) -> WaymarkResult<DependencyEdge> {
        if predecessor_id == successor_id {
            return Err(WaymarkError::Dependency(DependencyError::SelfDependency {
                id: predecessor_id,
            }));
        }

        self.storage
            .milestone_get(predecessor_id)?
            .ok_or(WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id: predecessor_id,
            }))?;
        self.storage
            .milestone_get(successor_id)?
            .ok_or(WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id: successor_id,
            }))?;

        let outgoing = self.storage.edge_query_by_predecessor(predecessor_id, true)?;
        if outgoing
            .iter()
            .any(|e| e.successor_id == successor_id && e.kind == kind)
        {
            return Err(WaymarkError::Dependency(DependencyError::DuplicateEdge {
                predecessor: predecessor_id,
                successor: successor_id,
                kind: kind.to_string(),
            }));
        }

        // A path successor -> ... -> predecessor means the new edge would
        // close a loop.
        if self.reaches(successor_id, predecessor_id)? {
            return Err(WaymarkError::Dependency(DependencyError::CycleDetected {
                predecessor: predecessor_id,
                successor: successor_id,
            }));
        }

        let edge = DependencyEdge::new(predecessor_id, successor_id, kind, lag_days, now);
        self.storage.edge_insert(&edge)?;
        debug!(
            "Created {} dependency {} -> {} (lag {})",
            kind, predecessor_id, successor_id, lag_days
        );
        Ok(edge)
    }

    /// Whether the milestone may enter InProgress as of the given day.
    /// True when it has no active incoming dependencies, or every one is
    /// satisfied.
    pub fn can_start(&self, milestone_id: MilestoneId, as_of: CalendarDate) -> WaymarkResult<bool> {
        Ok(self.blocking_dependencies(milestone_id, as_of)?.is_empty())
    }

    /// Every active incoming dependency currently holding the milestone
    /// back, with the reason.
    pub fn blocking_dependencies(
        &self,
        milestone_id: MilestoneId,
        as_of: CalendarDate,
    ) -> WaymarkResult<Vec<Blocker>> {
        let mut blockers = Vec::new();

        for edge in self.storage.edge_query_by_successor(milestone_id, true)? {
            let Some(predecessor) = self.storage.milestone_get(edge.predecessor_id)? else {
                // Predecessor record no longer resolves; the edge is
                // treated as satisfied.
                warn!(
                    "Dependency edge {} references missing predecessor {}",
                    edge.edge_id, edge.predecessor_id
                );
                continue;
            };

            if !edge.kind.satisfied_by(predecessor.status) {
                let reason = match edge.kind {
                    DependencyKind::FinishToStart | DependencyKind::FinishToFinish => {
                        BlockReason::PredecessorNotCompleted
                    }
                    DependencyKind::StartToStart | DependencyKind::StartToFinish => {
                        BlockReason::PredecessorNotStarted
                    }
                };
                blockers.push(Blocker {
                    predecessor_id: edge.predecessor_id,
                    predecessor_status: predecessor.status,
                    reason,
                    edge,
                });
                continue;
            }

            if edge.kind == DependencyKind::FinishToStart && edge.lag_days > 0 {
                let available_on = shift_date(
                    predecessor.completion_reference_date(),
                    i64::from(edge.lag_days),
                );
                if available_on > as_of {
                    blockers.push(Blocker {
                        predecessor_id: edge.predecessor_id,
                        predecessor_status: predecessor.status,
                        reason: BlockReason::LagNotElapsed { available_on },
                        edge,
                    });
                }
            }
        }

        Ok(blockers)
    }

    /// Propagate a target-date change at `predecessor_id` to its dependents.
    ///
    /// Only a push to a later date cascades; a pull-forward is a no-op.
    /// The walk is an iterative breadth-first pass over active successor
    /// edges. A visited set keyed by milestone id guarantees each milestone
    /// shifts at most once per call, however many edges fan into it, and
    /// keeps a cyclic store from hanging the walk. Terminal successors are
    /// skipped and the walk does not continue past them. Each shifted
    /// successor with an owner gets one alert.
    pub fn cascade_target_date_change(
        &self,
        predecessor_id: MilestoneId,
        old_date: CalendarDate,
        new_date: CalendarDate,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<CascadeReport> {
        let delta_days = days_between(old_date, new_date);
        if delta_days <= 0 {
            debug!(
                "No cascade from {}: date moved {} day(s), only later dates propagate",
                predecessor_id, delta_days
            );
            return Ok(CascadeReport::no_op(delta_days));
        }

        let root = self
            .storage
            .milestone_get(predecessor_id)?
            .ok_or(WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id: predecessor_id,
            }))?;

        let mut report = CascadeReport::no_op(delta_days);
        let mut visited: HashSet<MilestoneId> = HashSet::new();
        visited.insert(predecessor_id);
        let mut queue: VecDeque<MilestoneId> = VecDeque::new();
        queue.push_back(predecessor_id);

        while let Some(current) = queue.pop_front() {
            for edge in self.storage.edge_query_by_predecessor(current, true)? {
                if !visited.insert(edge.successor_id) {
                    continue;
                }
                let Some(successor) = self.storage.milestone_get(edge.successor_id)? else {
                    warn!(
                        "Dependency edge {} references missing successor {}",
                        edge.edge_id, edge.successor_id
                    );
                    continue;
                };

                if successor.is_terminal() {
                    report.skipped_terminal.push(successor.milestone_id);
                    continue;
                }

                let previous_target = successor.target_date;
                let new_target = shift_date(previous_target, delta_days);
                self.storage.milestone_update(
                    successor.milestone_id,
                    MilestoneUpdate {
                        target_date: Some(new_target),
                        updated_at: Some(now),
                        ..Default::default()
                    },
                )?;
                debug!(
                    "Cascade shifted '{}' from {} to {}",
                    successor.title, previous_target, new_target
                );

                if let Some(owner) = successor.owner_id {
                    notifier.send_activity_alert(
                        owner,
                        "Milestone rescheduled",
                        &format!(
                            "\"{}\" moved from {} to {} ({} day(s) later) after a date change to \"{}\"",
                            successor.title, previous_target, new_target, delta_days, root.title
                        ),
                    );
                }

                report.shifted.push(ShiftedMilestone {
                    milestone_id: successor.milestone_id,
                    previous_target,
                    new_target,
                });
                queue.push_back(successor.milestone_id);
            }
        }

        debug!(
            "Cascade from '{}' shifted {} milestone(s), skipped {} terminal",
            root.title,
            report.shifted.len(),
            report.skipped_terminal.len()
        );
        Ok(report)
    }

    /// Whether `target` is reachable from `from` over active edges.
    /// Iterative breadth-first walk; cycles in stored data cannot hang it.
    fn reaches(&self, from: MilestoneId, target: MilestoneId) -> WaymarkResult<bool> {
        if from == target {
            return Ok(true);
        }

        let mut visited: HashSet<MilestoneId> = HashSet::new();
        let mut queue: VecDeque<MilestoneId> = VecDeque::new();
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for edge in self.storage.edge_query_by_predecessor(current, true)? {
                if edge.successor_id == target {
                    return Ok(true);
                }
                if !visited.contains(&edge.successor_id) {
                    queue.push_back(edge.successor_id);
                }
            }
        }

        Ok(false)
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
    use waymark_core::Milestone;
    use waymark_storage::MockStorage;
    use waymark_test_utils::{NullNotifier, RecordingNotifier};

    fn test_now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> CalendarDate {
        CalendarDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (Arc<MockStorage>, DependencyEngine) {
        let storage = Arc::new(MockStorage::new());
        let engine = DependencyEngine::new(storage.clone());
        (storage, engine)
    }

    fn seed_milestone(
        storage: &MockStorage,
        title: &str,
        status: MilestoneStatus,
        target: CalendarDate,
    ) -> Milestone {
        let mut milestone =
            Milestone::new(Uuid::now_v7(), title, target, Uuid::now_v7(), test_now());
        milestone.status = status;
        storage.milestone_insert(&milestone).unwrap();
        milestone
    }

    #[test]
    fn test_create_dependency_persists_active_edge() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));

        let edge = engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                2,
                test_now(),
            )
            .unwrap();

        assert!(edge.active);
        assert_eq!(edge.lag_days, 2);
        let stored = storage.edge_get(edge.edge_id).unwrap().unwrap();
        assert_eq!(stored.predecessor_id, a.milestone_id);
        assert_eq!(stored.successor_id, b.milestone_id);
    }

    #[test]
    fn test_self_dependency_rejected() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));

        let err = engine
            .create_dependency(
                a.milestone_id,
                a.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::Dependency(DependencyError::SelfDependency { .. })
        ));
        assert_eq!(storage.edge_count(), 0);
    }

    #[test]
    fn test_reverse_edge_rejected_as_cycle() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));

        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        let err = engine
            .create_dependency(
                b.milestone_id,
                a.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            WaymarkError::Dependency(DependencyError::CycleDetected { .. })
        ));
        assert_eq!(storage.edge_count(), 1);
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        let c = seed_milestone(&storage, "C", MilestoneStatus::NotStarted, date(2024, 9, 1));

        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        engine
            .create_dependency(
                b.milestone_id,
                c.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let err = engine
            .create_dependency(
                c.milestone_id,
                a.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::Dependency(DependencyError::CycleDetected { .. })
        ));
        assert_eq!(storage.edge_count(), 2);
    }

    #[test]
    fn test_duplicate_active_edge_rejected_but_other_kind_allowed() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));

        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        let err = engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                3,
                test_now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::Dependency(DependencyError::DuplicateEdge { .. })
        ));

        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::StartToStart,
                0,
                test_now(),
            )
            .unwrap();
        assert_eq!(storage.edge_count(), 2);
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));

        let err = engine
            .create_dependency(
                a.milestone_id,
                Uuid::now_v7(),
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            WaymarkError::Storage(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_can_start_with_no_dependencies() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));

        assert!(engine.can_start(a.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_finish_to_start_blocks_until_predecessor_completes() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let blockers = engine
            .blocking_dependencies(b.milestone_id, date(2024, 6, 1))
            .unwrap();
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].predecessor_id, a.milestone_id);
        assert_eq!(blockers[0].reason, BlockReason::PredecessorNotCompleted);

        storage
            .milestone_update(
                a.milestone_id,
                MilestoneUpdate {
                    status: Some(MilestoneStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_start_to_start_satisfied_once_predecessor_begins() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::StartToStart,
                0,
                test_now(),
            )
            .unwrap();

        let blockers = engine
            .blocking_dependencies(b.milestone_id, date(2024, 6, 1))
            .unwrap();
        assert_eq!(blockers[0].reason, BlockReason::PredecessorNotStarted);

        storage
            .milestone_update(
                a.milestone_id,
                MilestoneUpdate {
                    status: Some(MilestoneStatus::InProgress),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_finish_to_start_lag_holds_until_elapsed() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::Completed, date(2024, 6, 1));
        storage
            .milestone_update(
                a.milestone_id,
                MilestoneUpdate {
                    actual_completion_date: Some(date(2024, 6, 1)),
                    ..Default::default()
                },
            )
            .unwrap();
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                2,
                test_now(),
            )
            .unwrap();

        let blockers = engine
            .blocking_dependencies(b.milestone_id, date(2024, 6, 2))
            .unwrap();
        assert_eq!(
            blockers[0].reason,
            BlockReason::LagNotElapsed {
                available_on: date(2024, 6, 3)
            }
        );

        assert!(engine.can_start(b.milestone_id, date(2024, 6, 3)).unwrap());
        assert!(engine.can_start(b.milestone_id, date(2024, 6, 4)).unwrap());
    }

    #[test]
    fn test_finish_to_start_lag_falls_back_to_target_date() {
        let (storage, engine) = setup();
        // Completed without an actual completion date recorded.
        let a = seed_milestone(&storage, "A", MilestoneStatus::Completed, date(2024, 6, 10));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                1,
                test_now(),
            )
            .unwrap();

        assert!(!engine.can_start(b.milestone_id, date(2024, 6, 10)).unwrap());
        assert!(engine.can_start(b.milestone_id, date(2024, 6, 11)).unwrap());
    }

    #[test]
    fn test_zero_lag_skips_date_check() {
        let (storage, engine) = setup();
        // Target date in the far future; with lag 0 only the status matters.
        let a = seed_milestone(&storage, "A", MilestoneStatus::Completed, date(2025, 1, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        assert!(engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_inactive_edges_do_not_block() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::NotStarted, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        let edge = engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        assert!(!engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());

        storage
            .edge_update(
                edge.edge_id,
                waymark_storage::EdgeUpdate {
                    active: Some(false),
                },
            )
            .unwrap();
        assert!(engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_missing_predecessor_treated_as_satisfied() {
        let (storage, engine) = setup();
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        // Insert an edge by hand whose predecessor was never stored.
        let edge = DependencyEdge::new(
            Uuid::now_v7(),
            b.milestone_id,
            DependencyKind::FinishToStart,
            0,
            test_now(),
        );
        storage.edge_insert(&edge).unwrap();

        assert!(engine.can_start(b.milestone_id, date(2024, 6, 1)).unwrap());
    }

    #[test]
    fn test_cascade_pull_forward_is_no_op() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 7, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 8, 1));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let report = engine
            .cascade_target_date_change(
                a.milestone_id,
                date(2024, 7, 1),
                date(2024, 6, 25),
                &NullNotifier,
                test_now(),
            )
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(report.delta_days, -6);
        let b_after = storage.milestone_get(b.milestone_id).unwrap().unwrap();
        assert_eq!(b_after.target_date, date(2024, 8, 1));
    }

    #[test]
    fn test_cascade_shifts_chain_by_delta() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 6, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 6, 10));
        let c = seed_milestone(&storage, "C", MilestoneStatus::NotStarted, date(2024, 6, 20));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        engine
            .create_dependency(
                b.milestone_id,
                c.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let report = engine
            .cascade_target_date_change(
                a.milestone_id,
                date(2024, 6, 1),
                date(2024, 6, 3),
                &NullNotifier,
                test_now(),
            )
            .unwrap();

        assert_eq!(report.delta_days, 2);
        assert_eq!(report.shifted.len(), 2);
        let b_after = storage.milestone_get(b.milestone_id).unwrap().unwrap();
        let c_after = storage.milestone_get(c.milestone_id).unwrap().unwrap();
        assert_eq!(b_after.target_date, date(2024, 6, 12));
        assert_eq!(c_after.target_date, date(2024, 6, 22));
    }

    #[test]
    fn test_cascade_diamond_shifts_each_milestone_once() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 6, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::NotStarted, date(2024, 6, 10));
        let c = seed_milestone(&storage, "C", MilestoneStatus::NotStarted, date(2024, 6, 10));
        let d = seed_milestone(&storage, "D", MilestoneStatus::NotStarted, date(2024, 6, 20));
        for (pred, succ) in [
            (a.milestone_id, b.milestone_id),
            (a.milestone_id, c.milestone_id),
            (b.milestone_id, d.milestone_id),
            (c.milestone_id, d.milestone_id),
        ] {
            engine
                .create_dependency(pred, succ, DependencyKind::FinishToStart, 0, test_now())
                .unwrap();
        }

        let report = engine
            .cascade_target_date_change(
                a.milestone_id,
                date(2024, 6, 1),
                date(2024, 6, 4),
                &NullNotifier,
                test_now(),
            )
            .unwrap();

        assert_eq!(report.shifted.len(), 3);
        let shifted_ids: Vec<_> = report.shifted.iter().map(|s| s.milestone_id).collect();
        let unique: HashSet<_> = shifted_ids.iter().collect();
        assert_eq!(unique.len(), shifted_ids.len());
        let d_after = storage.milestone_get(d.milestone_id).unwrap().unwrap();
        assert_eq!(d_after.target_date, date(2024, 6, 23));
    }

    #[test]
    fn test_cascade_skips_terminal_and_stops_behind_them() {
        let (storage, engine) = setup();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 6, 1));
        let b = seed_milestone(&storage, "B", MilestoneStatus::Completed, date(2024, 6, 10));
        let c = seed_milestone(&storage, "C", MilestoneStatus::NotStarted, date(2024, 6, 20));
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        engine
            .create_dependency(
                b.milestone_id,
                c.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let report = engine
            .cascade_target_date_change(
                a.milestone_id,
                date(2024, 6, 1),
                date(2024, 6, 5),
                &NullNotifier,
                test_now(),
            )
            .unwrap();

        assert!(report.shifted.is_empty());
        assert_eq!(report.skipped_terminal, vec![b.milestone_id]);
        let b_after = storage.milestone_get(b.milestone_id).unwrap().unwrap();
        let c_after = storage.milestone_get(c.milestone_id).unwrap().unwrap();
        assert_eq!(b_after.target_date, date(2024, 6, 10));
        assert_eq!(c_after.target_date, date(2024, 6, 20));
    }

    #[test]
    fn test_cascade_alerts_each_owned_successor_once() {
        let (storage, engine) = setup();
        let owner = Uuid::now_v7();
        let a = seed_milestone(&storage, "A", MilestoneStatus::InProgress, date(2024, 6, 1));
        let mut b = Milestone::new(
            Uuid::now_v7(),
            "B",
            date(2024, 6, 10),
            Uuid::now_v7(),
            test_now(),
        )
        .with_owner(owner);
        b.status = MilestoneStatus::NotStarted;
        storage.milestone_insert(&b).unwrap();
        let c = seed_milestone(&storage, "C", MilestoneStatus::NotStarted, date(2024, 6, 20));

        // Two parallel edges into B of different kinds; one alert expected.
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();
        engine
            .create_dependency(
                a.milestone_id,
                b.milestone_id,
                DependencyKind::StartToStart,
                0,
                test_now(),
            )
            .unwrap();
        engine
            .create_dependency(
                a.milestone_id,
                c.milestone_id,
                DependencyKind::FinishToStart,
                0,
                test_now(),
            )
            .unwrap();

        let notifier = RecordingNotifier::new();
        let report = engine
            .cascade_target_date_change(
                a.milestone_id,
                date(2024, 6, 1),
                date(2024, 6, 2),
                &notifier,
                test_now(),
            )
            .unwrap();

        assert_eq!(report.shifted.len(), 2);
        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].recipient, owner);
        assert_eq!(alerts[0].title, "Milestone rescheduled");
        assert!(alerts[0].body.contains("\"B\""));
        assert!(alerts[0].body.contains("\"A\""));
    }
}
