//! Error types for Waymark operations

use crate::{EntityType, MilestoneStatus};
use thiserror::Error;
use uuid::Uuid;

/// Dependency graph errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("Milestone cannot depend on itself: {id}")]
    SelfDependency { id: Uuid },

    #[error("Dependency from {predecessor} to {successor} would create a cycle")]
    CycleDetected { predecessor: Uuid, successor: Uuid },

    #[error("Active {kind} dependency from {predecessor} to {successor} already exists")]
    DuplicateEdge {
        predecessor: Uuid,
        successor: Uuid,
        kind: String,
    },

    #[error("Milestone {milestone} cannot start: {unsatisfied} unsatisfied dependencies")]
    NotSatisfied { milestone: Uuid, unsatisfied: usize },
}

/// Milestone lifecycle errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: MilestoneStatus,
        to: MilestoneStatus,
    },

    #[error("Party {owner} is not a member of project {project}")]
    OwnerNotMember { owner: Uuid, project: Uuid },

    #[error("Template {template} needs a base date: project has no start date and none was supplied")]
    MissingBaseDate { template: Uuid },
}

/// Approval workflow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Cannot submit milestone {milestone} for approval with no steps")]
    EmptySteps { milestone: Uuid },

    #[error("Approval step {approval} has already been decided")]
    AlreadyDecided { approval: Uuid },
}

/// Validation errors for operation inputs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: Uuid },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Config list {field} must be strictly ascending")]
    NotAscending { field: String },
}

/// Master error type for all Waymark errors.
#[derive(Debug, Clone, Error)]
pub enum WaymarkError {
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Waymark operations.
pub type WaymarkResult<T> = Result<T, WaymarkError>;

// =============================================================================
// TESTS
// =============================================================================
