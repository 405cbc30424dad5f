//! Domain service - where the RSVP invariants are enforced.
//!
//! Every write goes through [`RsvpService`]. It resolves entities, applies the
//! capacity and idempotency rules and hands the final mutation to the
//! [`EntityStore`] as a single atomic unit.
//!
//! # Join
//!
//! ```text
//! resolve event + user ──► past-event policy ──► per-event lock
//!        │                                            │
//!     NotFound                         already attending? ─► AlreadyAttending
//!                                                     │
//!                                       count ≥ capacity? ─► EventFull
//!                                                     │
//!                          conditional insert (retry on Contention) ─► Joined
//! ```
//!
//! The per-event lock serializes the check and the insert inside this
//! process. The store's conditional insert repeats the check atomically so a
//! second process sharing the same database cannot overshoot capacity either.
//!
//! # Past events
//!
//! Joining an event whose date has passed is allowed by default. Set
//! [`ServiceConfig::allow_past_events`] to `false` to reject such joins with
//! [`RsvpError::EventClosed`]. Cancelling is always allowed.

use crate::locks::EventLocks;
use crate::metrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use rsvp_core::{
    Capacity, Clock, EntityStore, Event, EventId, NewEvent, NewUser, Result, RsvpError, User,
    UserId,
};
use serde::Serialize;
use std::sync::Arc;

/// Policy knobs for the domain service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Backoff for contended attendance writes
    pub retry: RetryPolicy,
    /// Whether users may join events dated in the past
    pub allow_past_events: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            allow_past_events: true,
        }
    }
}

/// What a join or cancel did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpStatus {
    /// A new attendance row was recorded
    Joined,
    /// The user was already attending; nothing changed
    AlreadyAttending,
    /// The attendance row was removed
    Cancelled,
    /// The user was not attending; nothing changed
    NotAttending,
}

impl RsvpStatus {
    /// Whether the call mutated the attendance relation.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Joined | Self::Cancelled)
    }

    /// Human-readable summary for API payloads.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Joined => "Successfully RSVP'd to event",
            Self::AlreadyAttending => "Already attending this event",
            Self::Cancelled => "RSVP cancelled",
            Self::NotAttending => "Not attending this event",
        }
    }
}

/// Result of a successful join or cancel, with fresh derived fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpOutcome {
    /// Event the call targeted
    pub event_id: EventId,
    /// User the call acted for
    pub user_id: UserId,
    /// What happened
    pub status: RsvpStatus,
    /// Attendee count after the call
    pub attendee_count: u32,
    /// Remaining spots after the call; `None` when uncapacitated
    pub available_spots: Option<u32>,
}

/// Enforces capacity, idempotency and existence rules over an [`EntityStore`].
#[derive(Clone)]
pub struct RsvpService {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    locks: EventLocks,
    config: ServiceConfig,
}

impl std::fmt::Debug for RsvpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsvpService")
            .field("config", &self.config)
            .field("tracked_events", &self.locks.tracked())
            .finish_non_exhaustive()
    }
}

impl RsvpService {
    /// Create a service with the default [`ServiceConfig`].
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            locks: EventLocks::new(),
            config: ServiceConfig::default(),
        }
    }

    /// Replace the service configuration.
    #[must_use]
    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying store, for read paths that share it.
    #[must_use]
    pub fn store(&self) -> Arc<dyn EntityStore> {
        Arc::clone(&self.store)
    }

    /// The clock used for timestamps and policy checks.
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Register a user.
    ///
    /// The email is trimmed and lower-cased before the uniqueness check.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank or the email malformed
    /// - `EmailTaken` if the email is already registered
    #[tracing::instrument(skip(self, fields), fields(email = %fields.email))]
    pub async fn create_user(&self, fields: NewUser) -> Result<User> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(RsvpError::Validation("name must not be empty".to_string()));
        }

        let email = fields.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(RsvpError::Validation(format!(
                "email {email:?} is not a valid address"
            )));
        }

        let now = self.clock.now();
        let user = self
            .store
            .create_user(User {
                id: UserId::new(),
                name: name.to_string(),
                email,
                created_at: now,
                updated_at: now,
            })
            .await?;

        metrics::record_user_created();
        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Publish an event organized by `organizer_id`.
    ///
    /// Past dates are accepted.
    ///
    /// # Errors
    ///
    /// - `Validation` if the title is blank or the capacity is not positive
    /// - `NotFound` if the organizer does not exist
    #[tracing::instrument(skip(self, fields), fields(%organizer_id, title = %fields.title))]
    pub async fn create_event(&self, organizer_id: UserId, fields: NewEvent) -> Result<Event> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(RsvpError::Validation("title must not be empty".to_string()));
        }
        let capacity = fields.max_attendees.map(Capacity::new).transpose()?;

        self.store.get_user(organizer_id).await?;

        let now = self.clock.now();
        let event = self
            .store
            .create_event(Event {
                id: EventId::new(),
                title: title.to_string(),
                description: fields.description.trim().to_string(),
                date: fields.date,
                location: fields.location.trim().to_string(),
                max_attendees: capacity,
                organizer_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        metrics::record_event_created();
        tracing::info!(
            event_id = %event.id,
            capacity = ?event.max_attendees.map(|c| c.value()),
            "Event created"
        );
        Ok(event)
    }

    /// RSVP `user_id` to `event_id`.
    ///
    /// Idempotent: joining twice succeeds with [`RsvpStatus::AlreadyAttending`]
    /// and leaves the count unchanged.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user or event does not exist
    /// - `EventFull` if the event is at capacity (nothing is written)
    /// - `EventClosed` if past events are disallowed and the event is past
    /// - `Contention` if the insert stayed contended through every retry
    #[tracing::instrument(skip(self), fields(%user_id, %event_id))]
    pub async fn join_event(&self, user_id: UserId, event_id: EventId) -> Result<RsvpOutcome> {
        let result = self.try_join(user_id, event_id).await;
        metrics::record_join(&result);
        result
    }

    /// Withdraw `user_id`'s RSVP to `event_id`.
    ///
    /// Idempotent: cancelling when not attending succeeds with
    /// [`RsvpStatus::NotAttending`].
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user or event does not exist
    /// - `Contention` if the removal stayed contended through every retry
    #[tracing::instrument(skip(self), fields(%user_id, %event_id))]
    pub async fn cancel_rsvp(&self, user_id: UserId, event_id: EventId) -> Result<RsvpOutcome> {
        let result = self.try_cancel(user_id, event_id).await;
        metrics::record_cancel(&result);
        result
    }

    async fn try_join(&self, user_id: UserId, event_id: EventId) -> Result<RsvpOutcome> {
        let event = self.resolve(user_id, event_id).await?;

        let now = self.clock.now();
        if !self.config.allow_past_events && event.is_past(now) {
            tracing::info!(date = %event.date, "Join refused: event already took place");
            return Err(RsvpError::EventClosed { event_id });
        }

        let _guard = self.locks.acquire(event_id).await;

        if self.store.is_attending(user_id, event_id).await? {
            tracing::debug!("Already attending, join is a no-op");
            return self
                .outcome(&event, user_id, RsvpStatus::AlreadyAttending)
                .await;
        }

        let count = self.store.count_attendees(event_id).await?;
        if let Some(capacity) = event.max_attendees.filter(|_| event.is_full(count)) {
            tracing::info!(count, capacity = capacity.value(), "Join refused: event full");
            return Err(RsvpError::EventFull {
                event_id,
                capacity: capacity.value(),
            });
        }

        let store = &self.store;
        let capacity = event.max_attendees;
        let inserted = retry_with_predicate(
            &self.config.retry,
            move || match capacity {
                Some(capacity) => {
                    store.add_attendance_within_capacity(user_id, event_id, capacity, now)
                }
                None => store.add_attendance(user_id, event_id, now),
            },
            RsvpError::is_retryable,
        )
        .await;

        let status = match inserted {
            Ok(_) => RsvpStatus::Joined,
            Err(RsvpError::AlreadyExists { .. }) => RsvpStatus::AlreadyAttending,
            Err(err) => return Err(err),
        };

        let outcome = self.outcome(&event, user_id, status).await?;
        tracing::info!(
            attendee_count = outcome.attendee_count,
            available_spots = ?outcome.available_spots,
            "RSVP recorded"
        );
        Ok(outcome)
    }

    async fn try_cancel(&self, user_id: UserId, event_id: EventId) -> Result<RsvpOutcome> {
        let event = self.resolve(user_id, event_id).await?;

        let store = &self.store;
        let removed = retry_with_predicate(
            &self.config.retry,
            move || store.remove_attendance(user_id, event_id),
            RsvpError::is_retryable,
        )
        .await?;

        let status = if removed {
            RsvpStatus::Cancelled
        } else {
            tracing::debug!("Not attending, cancel is a no-op");
            RsvpStatus::NotAttending
        };

        let outcome = self.outcome(&event, user_id, status).await?;
        if removed {
            tracing::info!(attendee_count = outcome.attendee_count, "RSVP cancelled");
        }
        Ok(outcome)
    }

    async fn resolve(&self, user_id: UserId, event_id: EventId) -> Result<Event> {
        let event = self.store.get_event(event_id).await?;
        self.store.get_user(user_id).await?;
        Ok(event)
    }

    async fn outcome(
        &self,
        event: &Event,
        user_id: UserId,
        status: RsvpStatus,
    ) -> Result<RsvpOutcome> {
        let attendee_count = self.store.count_attendees(event.id).await?;
        Ok(RsvpOutcome {
            event_id: event.id,
            user_id,
            status,
            attendee_count,
            available_spots: event.available_spots(attendee_count),
        })
    }
}

/// Basic email shape check: one `@`, non-empty local part, dotted domain.
fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let valid_local = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_');
    let valid_domain = |c: char| c.is_alphanumeric() || matches!(c, '.' | '-');

    local.chars().all(valid_local)
        && domain.chars().all(valid_domain)
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::memory::InMemoryEntityStore;
    use chrono::{DateTime, Duration, Utc};
    use rsvp_testing::mocks::test_clock;

    fn service() -> RsvpService {
        RsvpService::new(Arc::new(InMemoryEntityStore::new()), Arc::new(test_clock()))
    }

    fn new_event(date: DateTime<Utc>, max_attendees: Option<i64>) -> NewEvent {
        NewEvent {
            title: "  Rust Meetup ".to_string(),
            description: "Talks and pizza".to_string(),
            date,
            location: "Berlin".to_string(),
            max_attendees,
        }
    }

    async fn user(service: &RsvpService, name: &str) -> User {
        service
            .create_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
            })
            .await
            .unwrap()
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user+tag@sub.example.co.uk"));
        assert!(!is_valid_email("invalid"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("a@b@example.com"));
        assert!(!is_valid_email("user@example..com"));
    }

    #[test]
    fn status_messages_and_change_flags() {
        assert!(RsvpStatus::Joined.changed());
        assert!(RsvpStatus::Cancelled.changed());
        assert!(!RsvpStatus::AlreadyAttending.changed());
        assert!(!RsvpStatus::NotAttending.changed());
        assert_eq!(RsvpStatus::Joined.message(), "Successfully RSVP'd to event");
    }

    #[tokio::test]
    async fn create_user_normalizes_email_and_rejects_duplicates() {
        let service = service();
        let created = service
            .create_user(NewUser {
                name: " Ada ".to_string(),
                email: " Ada@Example.COM ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.name, "Ada");
        assert_eq!(created.email, "ada@example.com");
        assert_eq!(created.created_at, test_clock().now());

        let err = service
            .create_user(NewUser {
                name: "Other Ada".to_string(),
                email: "ADA@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, RsvpError::EmailTaken("ada@example.com".to_string()));
    }

    #[tokio::test]
    async fn create_user_validates_fields() {
        let service = service();
        let blank = service
            .create_user(NewUser {
                name: "   ".to_string(),
                email: "a@example.com".to_string(),
            })
            .await;
        assert!(matches!(blank, Err(RsvpError::Validation(_))));

        let bad_email = service
            .create_user(NewUser {
                name: "Bob".to_string(),
                email: "bob".to_string(),
            })
            .await;
        assert!(matches!(bad_email, Err(RsvpError::Validation(_))));
    }

    #[tokio::test]
    async fn create_event_validates_capacity_title_and_organizer() {
        let service = service();
        let organizer = user(&service, "Org").await;
        let date = test_clock().now() + Duration::days(3);

        for bad in [0, -1] {
            let err = service
                .create_event(organizer.id, new_event(date, Some(bad)))
                .await
                .unwrap_err();
            assert!(matches!(err, RsvpError::Validation(_)));
        }

        let mut untitled = new_event(date, None);
        untitled.title = " ".to_string();
        assert!(matches!(
            service.create_event(organizer.id, untitled).await,
            Err(RsvpError::Validation(_))
        ));

        assert!(matches!(
            service
                .create_event(UserId::new(), new_event(date, None))
                .await,
            Err(RsvpError::NotFound { .. })
        ));

        let event = service
            .create_event(organizer.id, new_event(date, Some(10)))
            .await
            .unwrap();
        assert_eq!(event.title, "Rust Meetup");
        assert_eq!(event.organizer_id, organizer.id);
        assert_eq!(event.max_attendees.map(|c| c.value()), Some(10));
    }

    #[tokio::test]
    async fn past_events_may_be_created() {
        let service = service();
        let organizer = user(&service, "Org").await;
        let past = test_clock().now() - Duration::days(30);
        let event = service
            .create_event(organizer.id, new_event(past, None))
            .await
            .unwrap();
        assert!(event.is_past(test_clock().now()));
    }

    #[tokio::test]
    async fn organizer_is_not_an_implicit_attendee() {
        let service = service();
        let organizer = user(&service, "Org").await;
        let event = service
            .create_event(organizer.id, new_event(test_clock().now(), Some(2)))
            .await
            .unwrap();

        assert_eq!(service.store().count_attendees(event.id).await.unwrap(), 0);
        assert!(
            !service
                .store()
                .is_attending(organizer.id, event.id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn join_twice_counts_once() {
        let service = service();
        let organizer = user(&service, "Org").await;
        let guest = user(&service, "Guest").await;
        let event = service
            .create_event(organizer.id, new_event(test_clock().now(), Some(5)))
            .await
            .unwrap();

        let first = service.join_event(guest.id, event.id).await.unwrap();
        let second = service.join_event(guest.id, event.id).await.unwrap();

        assert_eq!(first.status, RsvpStatus::Joined);
        assert_eq!(second.status, RsvpStatus::AlreadyAttending);
        assert_eq!(second.attendee_count, 1);
        assert_eq!(second.available_spots, Some(4));
    }

    #[tokio::test]
    async fn cancel_twice_succeeds_and_decrements_once() {
        let service = service();
        let organizer = user(&service, "Org").await;
        let guest = user(&service, "Guest").await;
        let event = service
            .create_event(organizer.id, new_event(test_clock().now(), None))
            .await
            .unwrap();
        service.join_event(guest.id, event.id).await.unwrap();

        let first = service.cancel_rsvp(guest.id, event.id).await.unwrap();
        let second = service.cancel_rsvp(guest.id, event.id).await.unwrap();

        assert_eq!(first.status, RsvpStatus::Cancelled);
        assert_eq!(first.attendee_count, 0);
        assert_eq!(second.status, RsvpStatus::NotAttending);
        assert_eq!(second.attendee_count, 0);
        assert_eq!(second.available_spots, None);
    }

    #[tokio::test]
    async fn unknown_ids_fail_not_found_without_writing() {
        let service = service();
        let guest = user(&service, "Guest").await;
        let missing_event = EventId::new();

        let err = service.join_event(guest.id, missing_event).await.unwrap_err();
        assert_eq!(err, RsvpError::event_not_found(missing_event));
        assert!(
            service
                .store()
                .list_attending_events(guest.id)
                .await
                .unwrap()
                .is_empty()
        );

        let organizer = user(&service, "Org").await;
        let event = service
            .create_event(organizer.id, new_event(test_clock().now(), None))
            .await
            .unwrap();
        let missing_user = UserId::new();
        let err = service.cancel_rsvp(missing_user, event.id).await.unwrap_err();
        assert_eq!(err, RsvpError::user_not_found(missing_user));
    }

    #[tokio::test]
    async fn past_event_policy() {
        let permissive = service();
        let organizer = user(&permissive, "Org").await;
        let guest = user(&permissive, "Guest").await;
        let yesterday = test_clock().now() - Duration::days(1);
        let event = permissive
            .create_event(organizer.id, new_event(yesterday, None))
            .await
            .unwrap();

        let strict = permissive.clone().with_config(ServiceConfig {
            allow_past_events: false,
            ..ServiceConfig::default()
        });

        let err = strict.join_event(guest.id, event.id).await.unwrap_err();
        assert_eq!(err, RsvpError::EventClosed { event_id: event.id });

        let joined = permissive.join_event(guest.id, event.id).await.unwrap();
        assert_eq!(joined.status, RsvpStatus::Joined);

        // Cancelling stays possible under the strict policy.
        let cancelled = strict.cancel_rsvp(guest.id, event.id).await.unwrap();
        assert_eq!(cancelled.status, RsvpStatus::Cancelled);
    }
}
