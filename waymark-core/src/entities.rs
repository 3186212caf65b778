//! Core entity structures

use crate::{
    // ID types
    ApprovalId, DeliverableId, EdgeId, MilestoneId, PartyId, ProjectId, SnapshotId,
    // Other types
    ApprovalDecision, CalendarDate, DeliverableStatus, DependencyKind, MilestoneStatus, Timestamp,
    new_entity_id,
};
use serde::{Deserialize, Serialize};

/// Milestone - a dated, owned unit of project delivery.
/// The node type of the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub milestone_id: MilestoneId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub status: MilestoneStatus,
    pub target_date: CalendarDate,
    /// Set once, when the milestone completes
    pub actual_completion_date: Option<CalendarDate>,
    /// Completion percentage in [0, 100], two decimal places
    pub completion: f64,
    /// Signed schedule variance in days; negative means behind
    pub variance_days: i64,
    pub is_critical: bool,
    pub requires_approval: bool,
    pub is_at_risk: bool,
    pub owner_id: Option<PartyId>,
    pub stakeholders: Vec<PartyId>,
    pub created_by: PartyId,
    /// Highest progress threshold already notified; 0 means none yet
    pub last_notified_threshold: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub metadata: Option<serde_json::Value>,
}

impl Milestone {
    /// Create a new milestone with status NotStarted and zero progress.
    pub fn new(
        project_id: ProjectId,
        title: &str,
        target_date: CalendarDate,
        created_by: PartyId,
        now: Timestamp,
    ) -> Self {
        Self {
            milestone_id: new_entity_id(),
            project_id,
            title: title.to_string(),
            description: None,
            status: MilestoneStatus::NotStarted,
            target_date,
            actual_completion_date: None,
            completion: 0.0,
            variance_days: 0,
            is_critical: false,
            requires_approval: false,
            is_at_risk: false,
            owner_id: None,
            stakeholders: Vec::new(),
            created_by,
            last_notified_threshold: 0.0,
            created_at: now,
            updated_at: now,
            metadata: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Assign an owner.
    pub fn with_owner(mut self, owner_id: PartyId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Set the stakeholder list.
    pub fn with_stakeholders(mut self, stakeholders: Vec<PartyId>) -> Self {
        self.stakeholders = stakeholders;
        self
    }

    /// Mark as critical path.
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.is_critical = critical;
        self
    }

    /// Require the approval workflow before completion.
    pub fn with_requires_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Alert recipients: owner first (when assigned), then stakeholders,
    /// deduplicated in order.
    pub fn recipients(&self) -> Vec<PartyId> {
        let mut recipients = Vec::with_capacity(self.stakeholders.len() + 1);
        if let Some(owner) = self.owner_id {
            recipients.push(owner);
        }
        for stakeholder in &self.stakeholders {
            if !recipients.contains(stakeholder) {
                recipients.push(*stakeholder);
            }
        }
        recipients
    }

    /// Check if the milestone is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this milestone should count as overdue on the given day:
    /// non-terminal, target date passed, completion below 100.
    pub fn is_overdue(&self, today: CalendarDate) -> bool {
        !self.is_terminal() && self.target_date < today && self.completion < 100.0
    }

    /// The date lag is measured from for finish-type dependencies:
    /// actual completion date, falling back to the target date.
    pub fn completion_reference_date(&self) -> CalendarDate {
        self.actual_completion_date.unwrap_or(self.target_date)
    }
}

/// Dependency edge - a typed, directed link between two milestones.
/// Deactivated rather than deleted in normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub edge_id: EdgeId,
    pub predecessor_id: MilestoneId,
    pub successor_id: MilestoneId,
    pub kind: DependencyKind,
    /// Days that must elapse past the predecessor's reference date before
    /// a finish-to-start dependency clears
    pub lag_days: u32,
    pub active: bool,
    pub created_at: Timestamp,
}

impl DependencyEdge {
    /// Create a new active edge.
    pub fn new(
        predecessor_id: MilestoneId,
        successor_id: MilestoneId,
        kind: DependencyKind,
        lag_days: u32,
        now: Timestamp,
    ) -> Self {
        Self {
            edge_id: new_entity_id(),
            predecessor_id,
            successor_id,
            kind,
            lag_days,
            active: true,
            created_at: now,
        }
    }
}

/// Deliverable - a checklist item under a milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    pub deliverable_id: DeliverableId,
    pub milestone_id: MilestoneId,
    pub title: String,
    pub status: DeliverableStatus,
    pub sort_order: u32,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Deliverable {
    /// Create a new pending deliverable.
    pub fn new(milestone_id: MilestoneId, title: &str, sort_order: u32, now: Timestamp) -> Self {
        Self {
            deliverable_id: new_entity_id(),
            milestone_id,
            title: title.to_string(),
            status: DeliverableStatus::Pending,
            sort_order,
            completed_at: None,
            created_at: now,
        }
    }

    /// Mark as completed.
    pub fn complete(&mut self, now: Timestamp) {
        self.status = DeliverableStatus::Completed;
        self.completed_at = Some(now);
    }

    /// Check if the deliverable is done.
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

/// Approval step - one stage of a milestone's approval sequence.
/// Step numbers form a dense 1-based sequence per milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub approval_id: ApprovalId,
    pub milestone_id: MilestoneId,
    pub step_number: u32,
    pub approver_id: PartyId,
    pub decision: ApprovalDecision,
    pub decided_at: Option<Timestamp>,
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

impl ApprovalStep {
    /// Create a new pending step.
    pub fn new(
        milestone_id: MilestoneId,
        step_number: u32,
        approver_id: PartyId,
        now: Timestamp,
    ) -> Self {
        Self {
            approval_id: new_entity_id(),
            milestone_id,
            step_number,
            approver_id,
            decision: ApprovalDecision::Pending,
            decided_at: None,
            comment: None,
            created_at: now,
        }
    }

    /// Check if the step has been acted on.
    pub fn is_decided(&self) -> bool {
        self.decision.is_decided()
    }
}

/// Progress snapshot - immutable point-in-time record written on every
/// progress recompute. Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub snapshot_id: SnapshotId,
    pub milestone_id: MilestoneId,
    pub completion: f64,
    pub variance_days: i64,
    /// Tasks with completion below 100 at capture time
    pub remaining_tasks: u32,
    pub blocked_tasks: u32,
    pub captured_at: Timestamp,
}

impl ProgressSnapshot {
    /// Capture a snapshot.
    pub fn new(
        milestone_id: MilestoneId,
        completion: f64,
        variance_days: i64,
        remaining_tasks: u32,
        blocked_tasks: u32,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            snapshot_id: new_entity_id(),
            milestone_id,
            completion,
            variance_days,
            remaining_tasks,
            blocked_tasks,
            captured_at,
        }
    }
}
