//! Collaborator provider traits
//!
//! The engine is an internal library: notification delivery, project
//! membership, and task state live elsewhere. These traits are the seam.
//! Implementations are caller-supplied and must be thread-safe.

use crate::{CalendarDate, MilestoneId, PartyId, ProjectId};
use serde::{Deserialize, Serialize};

/// Trait for delivering activity alerts to people.
/// Implementations must be thread-safe (Send + Sync).
///
/// Delivery is fire-and-forget: the core neither awaits acknowledgment nor
/// orchestrates retries. Implementations own queueing and failure policy.
///
/// # Example
/// ```ignore
/// struct EmailNotifier { /* ... */ }
///
/// impl ActivityNotifier for EmailNotifier {
///     fn send_activity_alert(&self, recipient: PartyId, title: &str, body: &str) {
///         // Enqueue an email
///     }
/// }
/// ```
pub trait ActivityNotifier: Send + Sync {
    /// Send one alert to one recipient.
    ///
    /// # Arguments
    /// * `recipient` - The party to notify
    /// * `title` - Short human-readable subject
    /// * `body` - Human-readable detail line
    fn send_activity_alert(&self, recipient: PartyId, title: &str, body: &str);
}

/// Trait for project membership and baseline date lookups.
/// Implementations must be thread-safe (Send + Sync).
pub trait ProjectDirectory: Send + Sync {
    /// Whether the party is a member of the project.
    /// Consulted once when a milestone is created with an owner, and once
    /// per template application.
    fn is_member(&self, project_id: ProjectId, party_id: PartyId) -> bool;

    /// The project's start date, when one has been recorded.
    /// Used as the variance baseline and the template base date fallback.
    fn start_date(&self, project_id: ProjectId) -> Option<CalendarDate>;
}

/// Point-in-time state of one task associated with a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Completion percentage in [0, 100]
    pub percent_complete: f64,
    /// Relative weight; unweighted tasks count as 1
    pub weight: Option<f64>,
    pub blocked: bool,
}

impl TaskSnapshot {
    /// Create an unblocked, unweighted snapshot.
    pub fn new(percent_complete: f64) -> Self {
        Self {
            percent_complete,
            weight: None,
            blocked: false,
        }
    }

    /// Set the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Mark as blocked.
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    /// Weight used in the completion average; defaults to 1.
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    /// Whether the task still counts toward remaining work.
    pub fn is_remaining(&self) -> bool {
        self.percent_complete < 100.0
    }
}

/// Trait for reading the tasks associated with a milestone.
/// Implementations must be thread-safe (Send + Sync).
pub trait TaskStateSource: Send + Sync {
    /// Current snapshots of every task associated with the milestone.
    /// An empty result means the milestone has no tasks, not an error.
    fn tasks_for(&self, milestone_id: MilestoneId) -> Vec<TaskSnapshot>;
}
