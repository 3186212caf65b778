//! Identity and time types for Waymark entities

use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
/// UUIDv7 embeds a Unix timestamp, making IDs naturally sortable by creation time.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Calendar date without a time component. Target dates, completion dates
/// and project start dates are whole days, not instants.
pub type CalendarDate = NaiveDate;

/// Milestone identifier.
pub type MilestoneId = EntityId;

/// Project identifier.
pub type ProjectId = EntityId;

/// Party identifier (a person: owner, stakeholder, approver).
pub type PartyId = EntityId;

/// Dependency edge identifier.
pub type EdgeId = EntityId;

/// Deliverable identifier.
pub type DeliverableId = EntityId;

/// Approval step identifier.
pub type ApprovalId = EntityId;

/// Progress snapshot identifier.
pub type SnapshotId = EntityId;

/// Milestone template identifier.
pub type TemplateId = EntityId;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Signed whole days from `from` to `to`. Positive when `to` is later.
pub fn days_between(from: CalendarDate, to: CalendarDate) -> i64 {
    (to - from).num_days()
}

/// Shift a calendar date by a signed number of days.
pub fn shift_date(date: CalendarDate, days: i64) -> CalendarDate {
    date + Duration::days(days)
}
