//! Entity store trait - the single owner of persisted state.
//!
//! The store holds users, events and the user↔event attendance relation.
//! It is the only component allowed to mutate persisted state, which keeps the
//! serialization boundary for capacity enforcement in one place.
//!
//! # Implementations
//!
//! - `InMemoryEntityStore` (in `rsvp-runtime`): one lock over all tables
//! - `PostgresEntityStore` (in `rsvp-postgres`): durable, row-locked joins
//!
//! # Dyn Compatibility
//!
//! The trait goes through `async_trait` so the service and API layers can hold
//! an `Arc<dyn EntityStore>` and choose the backend at startup.

use crate::error::Result;
use crate::types::{Attendance, Capacity, Event, EventFilter, EventId, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage contract for users, events and attendance.
///
/// Every lookup by identifier fails with `RsvpError::NotFound` when the
/// identifier does not exist. No derived field is ever stored.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Get an event by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    async fn get_event(&self, id: EventId) -> Result<Event>;

    /// List events matching `filter`, ordered by date ascending.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>>;

    /// List all users, oldest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Persist a new user.
    ///
    /// # Errors
    ///
    /// `EmailTaken` if another user has the same email.
    async fn create_user(&self, user: User) -> Result<User>;

    /// Persist a new event.
    ///
    /// # Errors
    ///
    /// `NotFound` if the organizer does not exist.
    async fn create_event(&self, event: Event) -> Result<Event>;

    /// Insert an attendance row without consulting capacity.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if the pair is already present
    /// - `NotFound` if the user or event does not exist
    async fn add_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance>;

    /// Re-count and insert as one atomic unit, refusing at capacity.
    ///
    /// # Errors
    ///
    /// - `EventFull` if the event already has `capacity` attendees
    /// - `AlreadyExists` if the pair is already present
    /// - `NotFound` if the user or event does not exist
    /// - `Contention` if the unit could not be serialized; safe to retry
    async fn add_attendance_within_capacity(
        &self,
        user_id: UserId,
        event_id: EventId,
        capacity: Capacity,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance>;

    /// Remove an attendance row. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// `Contention` or `Storage` on backend failure.
    async fn remove_attendance(&self, user_id: UserId, event_id: EventId) -> Result<bool>;

    /// Number of attendance rows for an event.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    async fn count_attendees(&self, event_id: EventId) -> Result<u32>;

    /// Whether the pair is present.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user or event does not exist.
    async fn is_attending(&self, user_id: UserId, event_id: EventId) -> Result<bool>;

    /// Attending users in join order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    async fn list_attendees(&self, event_id: EventId) -> Result<Vec<User>>;

    /// Events organized by a user, ordered by date.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    async fn list_organized_events(&self, user_id: UserId) -> Result<Vec<Event>>;

    /// Events a user is attending, ordered by date.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    async fn list_attending_events(&self, user_id: UserId) -> Result<Vec<Event>>;

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// `Storage` if it is not.
    async fn ping(&self) -> Result<()>;
}
