//! WAYMARK Storage - Storage Trait and Mock Implementation
//!
//! Defines the storage abstraction layer for Waymark entities.
//! Production implementations are framework-owned; MockStorage backs
//! tests and benches.

use waymark_core::{
    ApprovalDecision, ApprovalStep, CalendarDate, Deliverable, DeliverableStatus, DependencyEdge,
    EntityType, Milestone, MilestoneStatus, MilestoneTemplate, PartyId, ProgressSnapshot,
    StorageError, Timestamp, WaymarkError, WaymarkResult,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

// ============================================================================
// UPDATE TYPES
// ============================================================================

/// Update payload for milestones.
#[derive(Debug, Clone, Default)]
pub struct MilestoneUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New status
    pub status: Option<MilestoneStatus>,
    /// New target date
    pub target_date: Option<CalendarDate>,
    /// Actual completion date, set on completion
    pub actual_completion_date: Option<CalendarDate>,
    /// New completion percentage
    pub completion: Option<f64>,
    /// New schedule variance
    pub variance_days: Option<i64>,
    /// New at-risk flag
    pub is_at_risk: Option<bool>,
    /// New approval requirement flag
    pub requires_approval: Option<bool>,
    /// New owner
    pub owner_id: Option<PartyId>,
    /// Advance the notification watermark
    pub last_notified_threshold: Option<f64>,
    /// Updated metadata
    pub metadata: Option<serde_json::Value>,
    /// Mutation timestamp, supplied by the caller's clock
    pub updated_at: Option<Timestamp>,
}

/// Update payload for dependency edges.
#[derive(Debug, Clone, Default)]
pub struct EdgeUpdate {
    /// Activate or deactivate the edge
    pub active: Option<bool>,
}

/// Update payload for deliverables.
#[derive(Debug, Clone, Default)]
pub struct DeliverableUpdate {
    /// New status
    pub status: Option<DeliverableStatus>,
    /// Completion timestamp
    pub completed_at: Option<Timestamp>,
}

/// Update payload for approval steps.
#[derive(Debug, Clone, Default)]
pub struct ApprovalUpdate {
    /// New decision
    pub decision: Option<ApprovalDecision>,
    /// Decision timestamp
    pub decided_at: Option<Timestamp>,
    /// Approver comment
    pub comment: Option<String>,
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

/// Storage trait for Waymark entities.
/// Implementations provide persistence for milestones, dependency edges,
/// deliverables, approval steps, progress snapshots, and templates.
///
/// Batch methods (`approval_replace_for_milestone`) are all-or-nothing.
pub trait StorageTrait: Send + Sync {
    // === Milestone Operations ===

    /// Insert a new milestone.
    fn milestone_insert(&self, m: &Milestone) -> WaymarkResult<()>;

    /// Get a milestone by ID.
    fn milestone_get(&self, id: Uuid) -> WaymarkResult<Option<Milestone>>;

    /// Update a milestone.
    fn milestone_update(&self, id: Uuid, update: MilestoneUpdate) -> WaymarkResult<()>;

    /// List milestones for a project, ordered by target date then id.
    fn milestone_list_by_project(&self, project_id: Uuid) -> WaymarkResult<Vec<Milestone>>;

    // === Dependency Edge Operations ===

    /// Insert a new dependency edge.
    fn edge_insert(&self, e: &DependencyEdge) -> WaymarkResult<()>;

    /// Get an edge by ID.
    fn edge_get(&self, id: Uuid) -> WaymarkResult<Option<DependencyEdge>>;

    /// Update an edge.
    fn edge_update(&self, id: Uuid, update: EdgeUpdate) -> WaymarkResult<()>;

    /// Query edges leaving a predecessor.
    fn edge_query_by_predecessor(
        &self,
        predecessor_id: Uuid,
        active_only: bool,
    ) -> WaymarkResult<Vec<DependencyEdge>>;

    /// Query edges arriving at a successor.
    fn edge_query_by_successor(
        &self,
        successor_id: Uuid,
        active_only: bool,
    ) -> WaymarkResult<Vec<DependencyEdge>>;

    // === Deliverable Operations ===

    /// Insert a new deliverable.
    fn deliverable_insert(&self, d: &Deliverable) -> WaymarkResult<()>;

    /// Get a deliverable by ID.
    fn deliverable_get(&self, id: Uuid) -> WaymarkResult<Option<Deliverable>>;

    /// Update a deliverable.
    fn deliverable_update(&self, id: Uuid, update: DeliverableUpdate) -> WaymarkResult<()>;

    /// List deliverables for a milestone, ordered by sort order.
    fn deliverable_list_by_milestone(&self, milestone_id: Uuid) -> WaymarkResult<Vec<Deliverable>>;

    // === Approval Operations ===

    /// Get an approval step by ID.
    fn approval_get(&self, id: Uuid) -> WaymarkResult<Option<ApprovalStep>>;

    /// Update an approval step.
    fn approval_update(&self, id: Uuid, update: ApprovalUpdate) -> WaymarkResult<()>;

    /// List approval steps for a milestone, ordered by step number.
    fn approval_list_by_milestone(&self, milestone_id: Uuid) -> WaymarkResult<Vec<ApprovalStep>>;

    /// Atomically replace a milestone's approval steps with a fresh
    /// sequence. Either every step lands or none do.
    fn approval_replace_for_milestone(
        &self,
        milestone_id: Uuid,
        steps: &[ApprovalStep],
    ) -> WaymarkResult<()>;

    // === Progress Snapshot Operations ===

    /// Append an immutable progress snapshot. Snapshots are never updated.
    fn snapshot_append(&self, s: &ProgressSnapshot) -> WaymarkResult<()>;

    /// List snapshots for a milestone, ordered by capture time.
    fn snapshot_list_by_milestone(&self, milestone_id: Uuid)
        -> WaymarkResult<Vec<ProgressSnapshot>>;

    // === Template Operations ===

    /// Insert a new template.
    fn template_insert(&self, t: &MilestoneTemplate) -> WaymarkResult<()>;

    /// Get a template by ID.
    fn template_get(&self, id: Uuid) -> WaymarkResult<Option<MilestoneTemplate>>;

    /// Increment a template's usage counter.
    fn template_record_use(&self, id: Uuid) -> WaymarkResult<()>;
}

// ============================================================================
// MOCK STORAGE
// ============================================================================

/// In-memory mock storage for testing.
#[derive(Debug, Default)]
pub struct MockStorage {
    milestones: Arc<RwLock<HashMap<Uuid, Milestone>>>,
    edges: Arc<RwLock<HashMap<Uuid, DependencyEdge>>>,
    deliverables: Arc<RwLock<HashMap<Uuid, Deliverable>>>,
    approvals: Arc<RwLock<HashMap<Uuid, ApprovalStep>>>,
    snapshots: Arc<RwLock<HashMap<Uuid, ProgressSnapshot>>>,
    templates: Arc<RwLock<HashMap<Uuid, MilestoneTemplate>>>,
}

impl MockStorage {
    /// Create a new mock storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> WaymarkResult<()> {
        self.milestones
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        self.edges
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        self.deliverables
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        self.approvals
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        self.snapshots
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        self.templates
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?
            .clear();
        Ok(())
    }

    /// Get count of stored milestones.
    pub fn milestone_count(&self) -> usize {
        self.milestones.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored edges.
    pub fn edge_count(&self) -> usize {
        self.edges.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored deliverables.
    pub fn deliverable_count(&self) -> usize {
        self.deliverables.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored approval steps.
    pub fn approval_count(&self) -> usize {
        self.approvals.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored snapshots.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Get count of stored templates.
    pub fn template_count(&self) -> usize {
        self.templates.read().map(|m| m.len()).unwrap_or(0)
    }
}

impl StorageTrait for MockStorage {
    // === Milestone Operations ===

    fn milestone_insert(&self, m: &Milestone) -> WaymarkResult<()> {
        let mut milestones = self
            .milestones
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        if milestones.contains_key(&m.milestone_id) {
            return Err(WaymarkError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Milestone,
                reason: "already exists".to_string(),
            }));
        }
        milestones.insert(m.milestone_id, m.clone());
        Ok(())
    }

    fn milestone_get(&self, id: Uuid) -> WaymarkResult<Option<Milestone>> {
        let milestones = self
            .milestones
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        Ok(milestones.get(&id).cloned())
    }

    fn milestone_update(&self, id: Uuid, update: MilestoneUpdate) -> WaymarkResult<()> {
        let mut milestones = self
            .milestones
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let milestone = milestones.get_mut(&id).ok_or(WaymarkError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id,
            },
        ))?;

        if let Some(title) = update.title {
            milestone.title = title;
        }
        if let Some(description) = update.description {
            milestone.description = Some(description);
        }
        if let Some(status) = update.status {
            milestone.status = status;
        }
        if let Some(target_date) = update.target_date {
            milestone.target_date = target_date;
        }
        if let Some(actual_completion_date) = update.actual_completion_date {
            milestone.actual_completion_date = Some(actual_completion_date);
        }
        if let Some(completion) = update.completion {
            milestone.completion = completion;
        }
        if let Some(variance_days) = update.variance_days {
            milestone.variance_days = variance_days;
        }
        if let Some(is_at_risk) = update.is_at_risk {
            milestone.is_at_risk = is_at_risk;
        }
        if let Some(requires_approval) = update.requires_approval {
            milestone.requires_approval = requires_approval;
        }
        if let Some(owner_id) = update.owner_id {
            milestone.owner_id = Some(owner_id);
        }
        if let Some(last_notified_threshold) = update.last_notified_threshold {
            milestone.last_notified_threshold = last_notified_threshold;
        }
        if let Some(metadata) = update.metadata {
            milestone.metadata = Some(metadata);
        }
        if let Some(updated_at) = update.updated_at {
            milestone.updated_at = updated_at;
        }

        Ok(())
    }

    fn milestone_list_by_project(&self, project_id: Uuid) -> WaymarkResult<Vec<Milestone>> {
        let milestones = self
            .milestones
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<Milestone> = milestones
            .values()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect();
        result.sort_by_key(|m| (m.target_date, m.milestone_id));
        Ok(result)
    }

    // === Dependency Edge Operations ===

    fn edge_insert(&self, e: &DependencyEdge) -> WaymarkResult<()> {
        let mut edges = self
            .edges
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        if edges.contains_key(&e.edge_id) {
            return Err(WaymarkError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::DependencyEdge,
                reason: "already exists".to_string(),
            }));
        }
        edges.insert(e.edge_id, e.clone());
        Ok(())
    }

    fn edge_get(&self, id: Uuid) -> WaymarkResult<Option<DependencyEdge>> {
        let edges = self
            .edges
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        Ok(edges.get(&id).cloned())
    }

    fn edge_update(&self, id: Uuid, update: EdgeUpdate) -> WaymarkResult<()> {
        let mut edges = self
            .edges
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let edge = edges.get_mut(&id).ok_or(WaymarkError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::DependencyEdge,
                id,
            },
        ))?;

        if let Some(active) = update.active {
            edge.active = active;
        }

        Ok(())
    }

    fn edge_query_by_predecessor(
        &self,
        predecessor_id: Uuid,
        active_only: bool,
    ) -> WaymarkResult<Vec<DependencyEdge>> {
        let edges = self
            .edges
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<DependencyEdge> = edges
            .values()
            .filter(|e| e.predecessor_id == predecessor_id && (!active_only || e.active))
            .cloned()
            .collect();
        result.sort_by_key(|e| e.edge_id);
        Ok(result)
    }

    fn edge_query_by_successor(
        &self,
        successor_id: Uuid,
        active_only: bool,
    ) -> WaymarkResult<Vec<DependencyEdge>> {
        let edges = self
            .edges
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<DependencyEdge> = edges
            .values()
            .filter(|e| e.successor_id == successor_id && (!active_only || e.active))
            .cloned()
            .collect();
        result.sort_by_key(|e| e.edge_id);
        Ok(result)
    }

    // === Deliverable Operations ===

    fn deliverable_insert(&self, d: &Deliverable) -> WaymarkResult<()> {
        let mut deliverables = self
            .deliverables
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        if deliverables.contains_key(&d.deliverable_id) {
            return Err(WaymarkError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Deliverable,
                reason: "already exists".to_string(),
            }));
        }
        deliverables.insert(d.deliverable_id, d.clone());
        Ok(())
    }

    fn deliverable_get(&self, id: Uuid) -> WaymarkResult<Option<Deliverable>> {
        let deliverables = self
            .deliverables
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        Ok(deliverables.get(&id).cloned())
    }

    fn deliverable_update(&self, id: Uuid, update: DeliverableUpdate) -> WaymarkResult<()> {
        let mut deliverables = self
            .deliverables
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let deliverable = deliverables.get_mut(&id).ok_or(WaymarkError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::Deliverable,
                id,
            },
        ))?;

        if let Some(status) = update.status {
            deliverable.status = status;
        }
        if let Some(completed_at) = update.completed_at {
            deliverable.completed_at = Some(completed_at);
        }

        Ok(())
    }

    fn deliverable_list_by_milestone(&self, milestone_id: Uuid) -> WaymarkResult<Vec<Deliverable>> {
        let deliverables = self
            .deliverables
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<Deliverable> = deliverables
            .values()
            .filter(|d| d.milestone_id == milestone_id)
            .cloned()
            .collect();
        result.sort_by_key(|d| (d.sort_order, d.deliverable_id));
        Ok(result)
    }

    // === Approval Operations ===

    fn approval_get(&self, id: Uuid) -> WaymarkResult<Option<ApprovalStep>> {
        let approvals = self
            .approvals
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        Ok(approvals.get(&id).cloned())
    }

    fn approval_update(&self, id: Uuid, update: ApprovalUpdate) -> WaymarkResult<()> {
        let mut approvals = self
            .approvals
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let approval = approvals.get_mut(&id).ok_or(WaymarkError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::ApprovalStep,
                id,
            },
        ))?;

        if let Some(decision) = update.decision {
            approval.decision = decision;
        }
        if let Some(decided_at) = update.decided_at {
            approval.decided_at = Some(decided_at);
        }
        if let Some(comment) = update.comment {
            approval.comment = Some(comment);
        }

        Ok(())
    }

    fn approval_list_by_milestone(&self, milestone_id: Uuid) -> WaymarkResult<Vec<ApprovalStep>> {
        let approvals = self
            .approvals
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<ApprovalStep> = approvals
            .values()
            .filter(|a| a.milestone_id == milestone_id)
            .cloned()
            .collect();
        result.sort_by_key(|a| a.step_number);
        Ok(result)
    }

    fn approval_replace_for_milestone(
        &self,
        milestone_id: Uuid,
        steps: &[ApprovalStep],
    ) -> WaymarkResult<()> {
        // One write lock for the whole swap keeps the replace atomic.
        let mut approvals = self
            .approvals
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        approvals.retain(|_, a| a.milestone_id != milestone_id);
        for step in steps {
            approvals.insert(step.approval_id, step.clone());
        }
        Ok(())
    }

    // === Progress Snapshot Operations ===

    fn snapshot_append(&self, s: &ProgressSnapshot) -> WaymarkResult<()> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        if snapshots.contains_key(&s.snapshot_id) {
            return Err(WaymarkError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::ProgressSnapshot,
                reason: "already exists".to_string(),
            }));
        }
        snapshots.insert(s.snapshot_id, s.clone());
        Ok(())
    }

    fn snapshot_list_by_milestone(
        &self,
        milestone_id: Uuid,
    ) -> WaymarkResult<Vec<ProgressSnapshot>> {
        let snapshots = self
            .snapshots
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let mut result: Vec<ProgressSnapshot> = snapshots
            .values()
            .filter(|s| s.milestone_id == milestone_id)
            .cloned()
            .collect();
        result.sort_by_key(|s| (s.captured_at, s.snapshot_id));
        Ok(result)
    }

    // === Template Operations ===

    fn template_insert(&self, t: &MilestoneTemplate) -> WaymarkResult<()> {
        let mut templates = self
            .templates
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        if templates.contains_key(&t.template_id) {
            return Err(WaymarkError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::MilestoneTemplate,
                reason: "already exists".to_string(),
            }));
        }
        templates.insert(t.template_id, t.clone());
        Ok(())
    }

    fn template_get(&self, id: Uuid) -> WaymarkResult<Option<MilestoneTemplate>> {
        let templates = self
            .templates
            .read()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        Ok(templates.get(&id).cloned())
    }

    fn template_record_use(&self, id: Uuid) -> WaymarkResult<()> {
        let mut templates = self
            .templates
            .write()
            .map_err(|_| WaymarkError::Storage(StorageError::LockPoisoned))?;
        let template = templates.get_mut(&id).ok_or(WaymarkError::Storage(
            StorageError::NotFound {
                entity_type: EntityType::MilestoneTemplate,
                id,
            },
        ))?;
        template.times_used += 1;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
