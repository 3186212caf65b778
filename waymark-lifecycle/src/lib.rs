//! WAYMARK Lifecycle - Milestone Orchestration
//!
//! Drives milestones through their state machine: creation, status
//! transitions, deliverable-driven review, approval sequences, template
//! instantiation, and the overdue sweep. The dependency engine is consulted
//! before work may start and after target dates move.
//!
//! Every operation takes the acting party, the collaborators it needs, and
//! the current time explicitly. Multi-step mutations validate everything
//! up front and only then write, so a rejected operation leaves no trace.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use waymark_core::{
    ActivityNotifier, ApprovalDecision, ApprovalError, ApprovalId, ApprovalStep, CalendarDate,
    Deliverable, DependencyError, EntityType, LifecycleError, Milestone, MilestoneId,
    MilestoneStatus, PartyId, ProjectDirectory, ProjectId, StorageError, TemplateId,
    TemplateOverrides, Timestamp, ValidationError, WaymarkError, WaymarkResult, shift_date,
};
use waymark_engine::{CascadeReport, DependencyEngine};
use waymark_storage::{ApprovalUpdate, MilestoneUpdate, StorageTrait};

// ============================================================================
// MILESTONE DRAFT
// ============================================================================

/// Input for milestone creation. Identity, status, and progress fields are
/// assigned by the lifecycle, never by the caller.
#[derive(Debug, Clone)]
pub struct MilestoneDraft {
    pub project_id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    pub target_date: CalendarDate,
    pub owner_id: Option<PartyId>,
    pub stakeholders: Vec<PartyId>,
    pub is_critical: bool,
    pub requires_approval: bool,
    pub metadata: Option<serde_json::Value>,
}

impl MilestoneDraft {
    /// Create a minimal draft.
    pub fn new(project_id: ProjectId, title: &str, target_date: CalendarDate) -> Self {
        Self {
            project_id,
            title: title.to_string(),
            description: None,
            target_date,
            owner_id: None,
            stakeholders: Vec::new(),
            is_critical: false,
            requires_approval: false,
            metadata: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Assign an owner. Membership is checked at creation time.
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
}

// ============================================================================
// APPROVAL OUTCOME
// ============================================================================

/// What recording one approval decision did to the milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Step recorded; other steps remain undecided
    Pending,
    /// Rejection reverted the milestone to InProgress
    Reverted,
    /// Final approval completed the milestone
    Completed,
}

// ============================================================================
// MILESTONE LIFECYCLE
// ============================================================================

/// Orchestrates milestone state over the shared store.
pub struct MilestoneLifecycle {
    storage: Arc<dyn StorageTrait>,
    engine: DependencyEngine,
}

impl MilestoneLifecycle {
    /// Create a lifecycle over the given storage. The dependency engine it
    /// consults shares the same store.
    pub fn new(storage: Arc<dyn StorageTrait>) -> Self {
        let engine = DependencyEngine::new(Arc::clone(&storage));
        Self { storage, engine }
    }

    /// The dependency engine backing this lifecycle.
    pub fn engine(&self) -> &DependencyEngine {
        &self.engine
    }

    /// Create a milestone from a draft.
    ///
    /// The title must be non-empty, and a draft owner must be a member of
    /// the draft's project. Persists with status NotStarted, completion 0,
    /// variance 0; the actor becomes `created_by`. The owner, when one is
    /// set, receives one assignment alert.
    pub fn create_milestone(
        &self,
        draft: MilestoneDraft,
        actor: PartyId,
        directory: &dyn ProjectDirectory,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<Milestone> {
        let MilestoneDraft {
            project_id,
            title,
            description,
            target_date,
            owner_id,
            stakeholders,
            is_critical,
            requires_approval,
            metadata,
        } = draft;

        if title.trim().is_empty() {
            return Err(WaymarkError::Validation(
                ValidationError::RequiredFieldMissing {
                    field: "title".to_string(),
                },
            ));
        }
        if let Some(owner) = owner_id {
            if !directory.is_member(project_id, owner) {
                return Err(WaymarkError::Lifecycle(LifecycleError::OwnerNotMember {
                    owner,
                    project: project_id,
                }));
            }
        }

        let mut milestone = Milestone::new(project_id, &title, target_date, actor, now)
            .with_stakeholders(stakeholders)
            .with_critical(is_critical)
            .with_requires_approval(requires_approval);
        if let Some(description) = &description {
            milestone = milestone.with_description(description);
        }
        if let Some(owner) = owner_id {
            milestone = milestone.with_owner(owner);
        }
        if let Some(metadata) = metadata {
            milestone = milestone.with_metadata(metadata);
        }

        self.storage.milestone_insert(&milestone)?;
        debug!(
            "Created milestone '{}' in project {} due {}",
            milestone.title, milestone.project_id, milestone.target_date
        );

        if let Some(owner) = milestone.owner_id {
            notifier.send_activity_alert(
                owner,
                "Milestone assigned",
                &format!(
                    "You are now responsible for \"{}\" (due {})",
                    milestone.title, milestone.target_date
                ),
            );
        }

        Ok(milestone)
    }

    /// Apply a caller-driven status transition.
    ///
    /// Setting the current status again is a silent no-op. Anything the
    /// transition table rejects fails with `InvalidTransition`. Entering
    /// InProgress additionally requires every active incoming dependency to
    /// be satisfied as of `as_of`; otherwise `NotSatisfied` and nothing
    /// changes. A transition into Completed also sets completion to 100 and
    /// the actual completion date to `as_of`. Every recipient is alerted
    /// with before/after labels.
    pub fn update_status(
        &self,
        milestone_id: MilestoneId,
        new_status: MilestoneStatus,
        actor: PartyId,
        notifier: &dyn ActivityNotifier,
        as_of: CalendarDate,
        now: Timestamp,
    ) -> WaymarkResult<Milestone> {
        let mut milestone = self.fetch_milestone(milestone_id)?;
        let from = milestone.status;
        if from == new_status {
            return Ok(milestone);
        }
        if !from.can_transition_to(new_status) {
            return Err(WaymarkError::Lifecycle(LifecycleError::InvalidTransition {
                from,
                to: new_status,
            }));
        }
        if new_status == MilestoneStatus::InProgress {
            let blockers = self.engine.blocking_dependencies(milestone_id, as_of)?;
            if !blockers.is_empty() {
                return Err(WaymarkError::Dependency(DependencyError::NotSatisfied {
                    milestone: milestone_id,
                    unsatisfied: blockers.len(),
                }));
            }
        }

        let mut update = MilestoneUpdate {
            status: Some(new_status),
            updated_at: Some(now),
            ..Default::default()
        };
        if new_status == MilestoneStatus::Completed {
            update.completion = Some(100.0);
            update.actual_completion_date = Some(as_of);
        }
        self.storage.milestone_update(milestone_id, update)?;

        milestone.status = new_status;
        milestone.updated_at = now;
        if new_status == MilestoneStatus::Completed {
            milestone.completion = 100.0;
            milestone.actual_completion_date = Some(as_of);
        }
        debug!(
            "Milestone '{}' moved from {} to {} by {}",
            milestone.title, from, new_status, actor
        );

        self.notify_recipients(
            &milestone,
            notifier,
            "Milestone status updated",
            &format!(
                "\"{}\" moved from {} to {}",
                milestone.title,
                from.label(),
                new_status.label()
            ),
        );

        Ok(milestone)
    }

    /// Move a milestone's target date and cascade the change.
    ///
    /// The milestone's own date is persisted first; when the date moved
    /// later, dependents shift through the engine (which alerts their
    /// owners). Pull-forwards and unchanged dates produce an empty report.
    pub fn reschedule(
        &self,
        milestone_id: MilestoneId,
        new_target_date: CalendarDate,
        actor: PartyId,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<CascadeReport> {
        let milestone = self.fetch_milestone(milestone_id)?;
        let old_target = milestone.target_date;

        if new_target_date != old_target {
            self.storage.milestone_update(
                milestone_id,
                MilestoneUpdate {
                    target_date: Some(new_target_date),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            debug!(
                "Milestone '{}' rescheduled from {} to {} by {}",
                milestone.title, old_target, new_target_date, actor
            );
        }

        self.engine
            .cascade_target_date_change(milestone_id, old_target, new_target_date, notifier, now)
    }

    /// Move a milestone to ReadyForReview once every deliverable is done.
    ///
    /// No-op (returning false) when the milestone has no deliverables, any
    /// deliverable is still open, or the milestone is already
    /// ReadyForReview, Completed, or Cancelled. On transition the owner is
    /// alerted.
    pub fn sync_status_from_deliverables(
        &self,
        milestone_id: MilestoneId,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<bool> {
        let milestone = self.fetch_milestone(milestone_id)?;
        if matches!(
            milestone.status,
            MilestoneStatus::ReadyForReview
                | MilestoneStatus::Completed
                | MilestoneStatus::Cancelled
        ) {
            return Ok(false);
        }

        let deliverables = self.storage.deliverable_list_by_milestone(milestone_id)?;
        if deliverables.is_empty() || !deliverables.iter().all(Deliverable::is_complete) {
            return Ok(false);
        }

        self.storage.milestone_update(
            milestone_id,
            MilestoneUpdate {
                status: Some(MilestoneStatus::ReadyForReview),
                updated_at: Some(now),
                ..Default::default()
            },
        )?;
        debug!(
            "Milestone '{}' is ready for review: all {} deliverable(s) complete",
            milestone.title,
            deliverables.len()
        );

        if let Some(owner) = milestone.owner_id {
            notifier.send_activity_alert(
                owner,
                "Milestone ready for review",
                &format!("All deliverables for \"{}\" are complete", milestone.title),
            );
        }

        Ok(true)
    }

    /// Start an approval sequence over the milestone.
    ///
    /// Replaces any existing approval steps with a fresh Pending sequence
    /// numbered 1..N in the order given, moves the milestone to UnderReview
    /// with `requires_approval` set, and alerts every approver. An empty
    /// approver list and terminal milestones are rejected before any write.
    pub fn submit_for_approval(
        &self,
        milestone_id: MilestoneId,
        approvers: &[PartyId],
        actor: PartyId,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<Vec<ApprovalStep>> {
        let milestone = self.fetch_milestone(milestone_id)?;
        if approvers.is_empty() {
            return Err(WaymarkError::Approval(ApprovalError::EmptySteps {
                milestone: milestone_id,
            }));
        }
        if milestone.is_terminal() {
            return Err(WaymarkError::Lifecycle(LifecycleError::InvalidTransition {
                from: milestone.status,
                to: MilestoneStatus::UnderReview,
            }));
        }

        let steps: Vec<ApprovalStep> = approvers
            .iter()
            .enumerate()
            .map(|(i, approver)| ApprovalStep::new(milestone_id, (i + 1) as u32, *approver, now))
            .collect();
        self.storage
            .approval_replace_for_milestone(milestone_id, &steps)?;
        self.storage.milestone_update(
            milestone_id,
            MilestoneUpdate {
                status: Some(MilestoneStatus::UnderReview),
                requires_approval: Some(true),
                updated_at: Some(now),
                ..Default::default()
            },
        )?;
        debug!(
            "Milestone '{}' submitted for approval by {} with {} step(s)",
            milestone.title,
            actor,
            steps.len()
        );

        for step in &steps {
            notifier.send_activity_alert(
                step.approver_id,
                "Approval requested",
                &format!(
                    "\"{}\" awaits your approval (step {} of {})",
                    milestone.title,
                    step.step_number,
                    steps.len()
                ),
            );
        }

        Ok(steps)
    }

    /// Record one approver's decision on a pending step.
    ///
    /// Rejection reverts the milestone to InProgress and alerts the owner
    /// with the comment. Approval completes the milestone (completion 100,
    /// actual date = `today`, all recipients alerted) once every step is
    /// Approved, and is otherwise silent. Re-deciding a decided step fails,
    /// as does passing Pending as the decision.
    pub fn record_approval_decision(
        &self,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        comment: Option<&str>,
        actor: PartyId,
        notifier: &dyn ActivityNotifier,
        today: CalendarDate,
        now: Timestamp,
    ) -> WaymarkResult<ApprovalOutcome> {
        let step = self.storage.approval_get(approval_id)?.ok_or(
            WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::ApprovalStep,
                id: approval_id,
            }),
        )?;
        if step.is_decided() {
            return Err(WaymarkError::Approval(ApprovalError::AlreadyDecided {
                approval: approval_id,
            }));
        }
        if decision == ApprovalDecision::Pending {
            return Err(WaymarkError::Validation(ValidationError::InvalidValue {
                field: "decision".to_string(),
                value: decision.to_string(),
                reason: "a recorded decision must be approved or rejected".to_string(),
            }));
        }

        self.storage.approval_update(
            approval_id,
            ApprovalUpdate {
                decision: Some(decision),
                decided_at: Some(now),
                comment: comment.map(str::to_string),
            },
        )?;
        let milestone = self.fetch_milestone(step.milestone_id)?;
        debug!(
            "Approval step {} for '{}' recorded as {} by {}",
            step.step_number, milestone.title, decision, actor
        );

        if decision == ApprovalDecision::Rejected {
            self.storage.milestone_update(
                step.milestone_id,
                MilestoneUpdate {
                    status: Some(MilestoneStatus::InProgress),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            if let Some(owner) = milestone.owner_id {
                let body = match comment {
                    Some(comment) => format!(
                        "\"{}\" was rejected at step {}: {}",
                        milestone.title, step.step_number, comment
                    ),
                    None => format!(
                        "\"{}\" was rejected at step {}",
                        milestone.title, step.step_number
                    ),
                };
                notifier.send_activity_alert(owner, "Approval rejected", &body);
            }
            return Ok(ApprovalOutcome::Reverted);
        }

        let steps = self.storage.approval_list_by_milestone(step.milestone_id)?;
        if !steps
            .iter()
            .all(|s| s.decision == ApprovalDecision::Approved)
        {
            return Ok(ApprovalOutcome::Pending);
        }

        self.storage.milestone_update(
            step.milestone_id,
            MilestoneUpdate {
                status: Some(MilestoneStatus::Completed),
                completion: Some(100.0),
                actual_completion_date: Some(today),
                updated_at: Some(now),
                ..Default::default()
            },
        )?;
        debug!(
            "Milestone '{}' completed: all {} approval step(s) approved",
            milestone.title,
            steps.len()
        );
        self.notify_recipients(
            &milestone,
            notifier,
            "Milestone completed",
            &format!("\"{}\" has been approved and completed", milestone.title),
        );

        Ok(ApprovalOutcome::Completed)
    }

    /// Instantiate a template into a project.
    ///
    /// Two phases: first every well-formed milestone definition becomes a
    /// milestone dated base + offset, recording definition index against
    /// the new id; then deliverables are attached and dependency
    /// definitions resolve through that index map into engine-checked
    /// edges. The base date is the override, falling back to the project
    /// start date; neither present fails with `MissingBaseDate`. The owner
    /// is the override, falling back to the template default, membership-
    /// checked once. Malformed definitions (empty titles, unresolved
    /// indices, edges the engine rejects) are skipped with a warning so one
    /// bad item never aborts the batch. Returns the created milestone ids
    /// in definition order.
    pub fn apply_template(
        &self,
        template_id: TemplateId,
        project_id: ProjectId,
        overrides: TemplateOverrides,
        actor: PartyId,
        directory: &dyn ProjectDirectory,
        notifier: &dyn ActivityNotifier,
        now: Timestamp,
    ) -> WaymarkResult<Vec<MilestoneId>> {
        let template = self.storage.template_get(template_id)?.ok_or(
            WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::MilestoneTemplate,
                id: template_id,
            }),
        )?;

        let owner = overrides.owner_id.or(template.default_owner);
        if let Some(owner_id) = owner {
            if !directory.is_member(project_id, owner_id) {
                return Err(WaymarkError::Lifecycle(LifecycleError::OwnerNotMember {
                    owner: owner_id,
                    project: project_id,
                }));
            }
        }
        let base_date = overrides
            .base_date
            .or_else(|| directory.start_date(project_id))
            .ok_or(WaymarkError::Lifecycle(LifecycleError::MissingBaseDate {
                template: template_id,
            }))?;

        // Phase 1: milestones, keyed by definition index.
        let mut index_to_id: HashMap<usize, MilestoneId> = HashMap::new();
        let mut created: Vec<Milestone> = Vec::new();
        for (index, definition) in template.milestones.iter().enumerate() {
            if definition.title.trim().is_empty() {
                warn!(
                    "Skipping milestone definition {} of template '{}': empty title",
                    index, template.name
                );
                continue;
            }

            let mut milestone = Milestone::new(
                project_id,
                &definition.title,
                shift_date(base_date, definition.offset_days),
                actor,
                now,
            )
            .with_critical(definition.is_critical)
            .with_requires_approval(definition.requires_approval);
            if let Some(description) = &definition.description {
                milestone = milestone.with_description(description);
            }
            if let Some(owner_id) = owner {
                milestone = milestone.with_owner(owner_id);
            }

            self.storage.milestone_insert(&milestone)?;
            index_to_id.insert(index, milestone.milestone_id);
            created.push(milestone);
        }

        // Phase 2: deliverables and dependencies, resolved via the map.
        for (index, definition) in template.milestones.iter().enumerate() {
            let Some(&milestone_id) = index_to_id.get(&index) else {
                continue;
            };
            for deliverable_definition in &definition.deliverables {
                if deliverable_definition.title.trim().is_empty() {
                    warn!(
                        "Skipping deliverable definition under milestone {} of template '{}': empty title",
                        index, template.name
                    );
                    continue;
                }
                let deliverable = Deliverable::new(
                    milestone_id,
                    &deliverable_definition.title,
                    deliverable_definition.sort_order,
                    now,
                );
                self.storage.deliverable_insert(&deliverable)?;
            }
        }
        for dependency in &template.dependencies {
            let (Some(&predecessor), Some(&successor)) = (
                index_to_id.get(&dependency.predecessor_index),
                index_to_id.get(&dependency.successor_index),
            ) else {
                warn!(
                    "Skipping dependency definition {} -> {} of template '{}': unresolved index",
                    dependency.predecessor_index, dependency.successor_index, template.name
                );
                continue;
            };
            if let Err(e) = self.engine.create_dependency(
                predecessor,
                successor,
                dependency.kind,
                dependency.lag_days,
                now,
            ) {
                warn!(
                    "Skipping dependency definition {} -> {} of template '{}': {}",
                    dependency.predecessor_index, dependency.successor_index, template.name, e
                );
            }
        }

        self.storage.template_record_use(template_id)?;
        debug!(
            "Applied template '{}': {} milestone(s) created in project {}",
            template.name,
            created.len(),
            project_id
        );

        for milestone in &created {
            if let Some(owner_id) = milestone.owner_id {
                notifier.send_activity_alert(
                    owner_id,
                    "Milestone assigned",
                    &format!(
                        "You are now responsible for \"{}\" (due {})",
                        milestone.title, milestone.target_date
                    ),
                );
            }
        }

        Ok(created.iter().map(|m| m.milestone_id).collect())
    }

    /// Mark every overdue milestone of a project Overdue.
    ///
    /// A milestone qualifies when it is non-terminal, its target date is
    /// before `today`, and completion is below 100. Milestones already
    /// Overdue are left alone. Recipients of each swept milestone are
    /// alerted. Returns the swept ids.
    pub fn sweep_overdue(
        &self,
        project_id: ProjectId,
        actor: PartyId,
        notifier: &dyn ActivityNotifier,
        today: CalendarDate,
        now: Timestamp,
    ) -> WaymarkResult<Vec<MilestoneId>> {
        let milestones = self.storage.milestone_list_by_project(project_id)?;
        let mut swept = Vec::new();

        for milestone in milestones {
            if milestone.status == MilestoneStatus::Overdue || !milestone.is_overdue(today) {
                continue;
            }
            self.storage.milestone_update(
                milestone.milestone_id,
                MilestoneUpdate {
                    status: Some(MilestoneStatus::Overdue),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            self.notify_recipients(
                &milestone,
                notifier,
                "Milestone overdue",
                &format!(
                    "\"{}\" was due {} and is not complete",
                    milestone.title, milestone.target_date
                ),
            );
            swept.push(milestone.milestone_id);
        }

        if !swept.is_empty() {
            debug!(
                "Overdue sweep by {} marked {} milestone(s) in project {}",
                actor,
                swept.len(),
                project_id
            );
        }
        Ok(swept)
    }

    fn fetch_milestone(&self, id: MilestoneId) -> WaymarkResult<Milestone> {
        self.storage
            .milestone_get(id)?
            .ok_or(WaymarkError::Storage(StorageError::NotFound {
                entity_type: EntityType::Milestone,
                id,
            }))
    }

    fn notify_recipients(
        &self,
        milestone: &Milestone,
        notifier: &dyn ActivityNotifier,
        title: &str,
        body: &str,
    ) {
        for recipient in milestone.recipients() {
            notifier.send_activity_alert(recipient, title, body);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
