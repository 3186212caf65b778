//! Enum types for Waymark entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CORE ENUMS
// ============================================================================

/// Entity type discriminator for polymorphic references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Milestone,
    DependencyEdge,
    Deliverable,
    ApprovalStep,
    ProgressSnapshot,
    MilestoneTemplate,
}

/// Status of a milestone in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MilestoneStatus {
    /// Planned but no work has begun
    #[default]
    NotStarted,
    /// Work is underway
    InProgress,
    /// All work done, awaiting review submission
    ReadyForReview,
    /// Approval sequence in flight
    UnderReview,
    /// Done; terminal
    Completed,
    /// Target date passed with completion below 100
    Overdue,
    /// Abandoned; terminal
    Cancelled,
}

impl MilestoneStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "not_started",
            MilestoneStatus::InProgress => "in_progress",
            MilestoneStatus::ReadyForReview => "ready_for_review",
            MilestoneStatus::UnderReview => "under_review",
            MilestoneStatus::Completed => "completed",
            MilestoneStatus::Overdue => "overdue",
            MilestoneStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, MilestoneStatusParseError> {
        match s.to_lowercase().as_str() {
            "not_started" => Ok(MilestoneStatus::NotStarted),
            "in_progress" => Ok(MilestoneStatus::InProgress),
            "ready_for_review" => Ok(MilestoneStatus::ReadyForReview),
            "under_review" => Ok(MilestoneStatus::UnderReview),
            "completed" => Ok(MilestoneStatus::Completed),
            "overdue" => Ok(MilestoneStatus::Overdue),
            "cancelled" => Ok(MilestoneStatus::Cancelled),
            _ => Err(MilestoneStatusParseError(s.to_string())),
        }
    }

    /// Human-readable label for alert bodies.
    pub fn label(&self) -> &'static str {
        match self {
            MilestoneStatus::NotStarted => "Not Started",
            MilestoneStatus::InProgress => "In Progress",
            MilestoneStatus::ReadyForReview => "Ready for Review",
            MilestoneStatus::UnderReview => "Under Review",
            MilestoneStatus::Completed => "Completed",
            MilestoneStatus::Overdue => "Overdue",
            MilestoneStatus::Cancelled => "Cancelled",
        }
    }

    /// Check if this status accepts no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MilestoneStatus::Completed | MilestoneStatus::Cancelled)
    }

    /// Check if work has at least begun. Overdue alone does not imply a
    /// start: a milestone can go overdue without anyone touching it.
    pub fn has_begun(&self) -> bool {
        matches!(
            self,
            MilestoneStatus::InProgress
                | MilestoneStatus::ReadyForReview
                | MilestoneStatus::UnderReview
                | MilestoneStatus::Completed
        )
    }

    /// Whether a caller-driven status update from `self` to `next` is legal.
    /// Same-status updates are handled upstream as no-ops and return false
    /// here. Terminal states accept nothing.
    pub fn can_transition_to(&self, next: MilestoneStatus) -> bool {
        use MilestoneStatus::*;
        match self {
            NotStarted => matches!(next, InProgress | Overdue | Cancelled),
            InProgress => matches!(next, ReadyForReview | Completed | Overdue | Cancelled),
            ReadyForReview => {
                matches!(next, InProgress | UnderReview | Completed | Overdue | Cancelled)
            }
            UnderReview => matches!(next, InProgress | Completed | Overdue | Cancelled),
            Overdue => {
                matches!(next, InProgress | ReadyForReview | UnderReview | Completed | Cancelled)
            }
            Completed => false,
            Cancelled => false,
        }
    }
}

impl fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for MilestoneStatus {
    type Err = MilestoneStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid milestone status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneStatusParseError(pub String);

impl fmt::Display for MilestoneStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid milestone status: {}", self.0)
    }
}

impl std::error::Error for MilestoneStatusParseError {}

/// Kind of a dependency edge, governing which predecessor state satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DependencyKind {
    /// Successor may start once the predecessor finishes
    #[default]
    FinishToStart,
    /// Successor may finish once the predecessor finishes
    FinishToFinish,
    /// Successor may start once the predecessor starts
    StartToStart,
    /// Successor may finish once the predecessor starts
    StartToFinish,
}

impl DependencyKind {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DependencyKind::FinishToStart => "finish_to_start",
            DependencyKind::FinishToFinish => "finish_to_finish",
            DependencyKind::StartToStart => "start_to_start",
            DependencyKind::StartToFinish => "start_to_finish",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, DependencyKindParseError> {
        match s.to_lowercase().as_str() {
            "finish_to_start" => Ok(DependencyKind::FinishToStart),
            "finish_to_finish" => Ok(DependencyKind::FinishToFinish),
            "start_to_start" => Ok(DependencyKind::StartToStart),
            "start_to_finish" => Ok(DependencyKind::StartToFinish),
            _ => Err(DependencyKindParseError(s.to_string())),
        }
    }

    /// Whether the given predecessor status satisfies this kind of
    /// dependency. Lag handling is layered on top by the engine; this is
    /// the pure status rule.
    pub fn satisfied_by(&self, predecessor: MilestoneStatus) -> bool {
        match self {
            DependencyKind::FinishToStart | DependencyKind::FinishToFinish => {
                predecessor == MilestoneStatus::Completed
            }
            DependencyKind::StartToStart | DependencyKind::StartToFinish => {
                predecessor.has_begun()
            }
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for DependencyKind {
    type Err = DependencyKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid dependency kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyKindParseError(pub String);

impl fmt::Display for DependencyKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid dependency kind: {}", self.0)
    }
}

impl std::error::Error for DependencyKindParseError {}

/// Decision state of one approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ApprovalDecision {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalDecision {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ApprovalDecision::Pending => "pending",
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::Rejected => "rejected",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, ApprovalDecisionParseError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalDecision::Pending),
            "approved" => Ok(ApprovalDecision::Approved),
            "rejected" => Ok(ApprovalDecision::Rejected),
            _ => Err(ApprovalDecisionParseError(s.to_string())),
        }
    }

    /// Check if the step has been acted on.
    pub fn is_decided(&self) -> bool {
        !matches!(self, ApprovalDecision::Pending)
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for ApprovalDecision {
    type Err = ApprovalDecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid approval decision string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalDecisionParseError(pub String);

impl fmt::Display for ApprovalDecisionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid approval decision: {}", self.0)
    }
}

impl std::error::Error for ApprovalDecisionParseError {}

/// Status of a deliverable attached to a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeliverableStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl DeliverableStatus {
    /// Convert to database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            DeliverableStatus::Pending => "pending",
            DeliverableStatus::InProgress => "in_progress",
            DeliverableStatus::Completed => "completed",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self, DeliverableStatusParseError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeliverableStatus::Pending),
            "in_progress" => Ok(DeliverableStatus::InProgress),
            "completed" => Ok(DeliverableStatus::Completed),
            _ => Err(DeliverableStatusParseError(s.to_string())),
        }
    }

    /// Check if the deliverable is done.
    pub fn is_complete(&self) -> bool {
        matches!(self, DeliverableStatus::Completed)
    }
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_str())
    }
}

impl FromStr for DeliverableStatus {
    type Err = DeliverableStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s)
    }
}

/// Error when parsing an invalid deliverable status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverableStatusParseError(pub String);

impl fmt::Display for DeliverableStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid deliverable status: {}", self.0)
    }
}

impl std::error::Error for DeliverableStatusParseError {}
