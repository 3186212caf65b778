//! Milestone templates for bulk provisioning

use crate::{CalendarDate, DependencyKind, PartyId, TemplateId, Timestamp, new_entity_id};
use serde::{Deserialize, Serialize};

/// A reusable plan: an ordered list of milestone definitions plus
/// dependency definitions that reference them by index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneTemplate {
    pub template_id: TemplateId,
    pub name: String,
    pub description: Option<String>,
    /// Fallback owner for instantiated milestones when the application
    /// supplies none
    pub default_owner: Option<PartyId>,
    pub milestones: Vec<MilestoneDefinition>,
    pub dependencies: Vec<DependencyDefinition>,
    /// How many times this template has been applied
    pub times_used: u32,
    pub created_at: Timestamp,
    pub metadata: Option<serde_json::Value>,
}

impl MilestoneTemplate {
    /// Create an empty template.
    pub fn new(name: &str, now: Timestamp) -> Self {
        Self {
            template_id: new_entity_id(),
            name: name.to_string(),
            description: None,
            default_owner: None,
            milestones: Vec::new(),
            dependencies: Vec::new(),
            times_used: 0,
            created_at: now,
            metadata: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Set the fallback owner.
    pub fn with_default_owner(mut self, owner_id: PartyId) -> Self {
        self.default_owner = Some(owner_id);
        self
    }

    /// Append a milestone definition.
    pub fn with_milestone(mut self, definition: MilestoneDefinition) -> Self {
        self.milestones.push(definition);
        self
    }

    /// Append a dependency definition.
    pub fn with_dependency(mut self, definition: DependencyDefinition) -> Self {
        self.dependencies.push(definition);
        self
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One milestone to instantiate, dated relative to the application's
/// base date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneDefinition {
    pub title: String,
    pub description: Option<String>,
    /// Days from the base date to this milestone's target date
    pub offset_days: i64,
    pub is_critical: bool,
    pub requires_approval: bool,
    pub deliverables: Vec<DeliverableDefinition>,
}

impl MilestoneDefinition {
    /// Create a definition with no deliverables.
    pub fn new(title: &str, offset_days: i64) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            offset_days,
            is_critical: false,
            requires_approval: false,
            deliverables: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Mark as critical path.
    pub fn with_critical(mut self, critical: bool) -> Self {
        self.is_critical = critical;
        self
    }

    /// Require the approval workflow.
    pub fn with_requires_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }

    /// Append a deliverable definition.
    pub fn with_deliverable(mut self, definition: DeliverableDefinition) -> Self {
        self.deliverables.push(definition);
        self
    }
}

/// One deliverable to attach to an instantiated milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableDefinition {
    pub title: String,
    pub sort_order: u32,
}

impl DeliverableDefinition {
    pub fn new(title: &str, sort_order: u32) -> Self {
        Self {
            title: title.to_string(),
            sort_order,
        }
    }
}

/// One dependency edge to create between instantiated milestones,
/// identified by their positions in the definition list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDefinition {
    pub predecessor_index: usize,
    pub successor_index: usize,
    pub kind: DependencyKind,
    pub lag_days: u32,
}

impl DependencyDefinition {
    pub fn new(predecessor_index: usize, successor_index: usize, kind: DependencyKind) -> Self {
        Self {
            predecessor_index,
            successor_index,
            kind,
            lag_days: 0,
        }
    }

    /// Set the lag.
    pub fn with_lag_days(mut self, lag_days: u32) -> Self {
        self.lag_days = lag_days;
        self
    }
}

/// Per-application overrides for template instantiation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateOverrides {
    /// Base date for offset resolution; falls back to the project start date
    pub base_date: Option<CalendarDate>,
    /// Owner for every instantiated milestone; falls back to the template's
    /// default owner
    pub owner_id: Option<PartyId>,
}

impl TemplateOverrides {
    /// No overrides: base date and owner resolve from project and template.
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the base date.
    pub fn with_base_date(mut self, base_date: CalendarDate) -> Self {
        self.base_date = Some(base_date);
        self
    }

    /// Override the owner.
    pub fn with_owner(mut self, owner_id: PartyId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }
}
