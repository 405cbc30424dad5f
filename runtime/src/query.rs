//! Query resolution: read paths with derived fields.
//!
//! Nothing here is cached. Counts, remaining spots and attendance flags are
//! computed from the attendance relation on every call, so a read that follows
//! a completed join or cancel always observes it.

use rsvp_core::{
    Clock, EntityStore, Event, EventFilter, EventId, Result, User, UserId,
};
use serde::Serialize;
use std::sync::Arc;

/// An event with its derived counters.
///
/// `attendee_count` and `available_spots` come from the same count read, so
/// for a capped event they always add up to the capacity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    /// The persisted event
    #[serde(flatten)]
    pub event: Event,
    /// Current number of attendees
    pub attendee_count: u32,
    /// Remaining spots; `None` when uncapacitated
    pub available_spots: Option<u32>,
}

impl EventSummary {
    fn new(event: Event, attendee_count: u32) -> Self {
        let available_spots = event.available_spots(attendee_count);
        Self {
            event,
            attendee_count,
            available_spots,
        }
    }

    /// Whether the event has reached capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.event.is_full(self.attendee_count)
    }
}

/// Full event view: counters, organizer, attendees and, when a viewer is
/// given, whether the viewer is attending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Event plus derived counters
    #[serde(flatten)]
    pub summary: EventSummary,
    /// The organizing user
    pub organizer: User,
    /// Attending users in join order
    pub attendees: Vec<User>,
    /// Viewer attendance; absent when no viewer was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_user_attending: Option<bool>,
}

/// Full user view: the user plus both sides of their event relations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    /// The persisted user
    #[serde(flatten)]
    pub user: User,
    /// Events this user organizes
    pub organized_events: Vec<EventSummary>,
    /// Events this user is attending
    pub attending_events: Vec<EventSummary>,
}

/// Read-side resolver over an [`EntityStore`].
#[derive(Clone)]
pub struct QueryResolver {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QueryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResolver").finish_non_exhaustive()
    }
}

impl QueryResolver {
    /// Create a resolver reading from `store`; `clock` decides what is upcoming.
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// One event with counters.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn event(&self, id: EventId) -> Result<EventSummary> {
        let event = self.store.get_event(id).await?;
        self.summarize(event).await
    }

    /// All events, ordered by date.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    pub async fn events(&self) -> Result<Vec<EventSummary>> {
        let events = self.store.list_events(&EventFilter::all()).await?;
        self.summarize_all(events).await
    }

    /// Events dated now or later, soonest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    pub async fn upcoming_events(&self) -> Result<Vec<EventSummary>> {
        let filter = EventFilter::upcoming(self.clock.now());
        let events = self.store.list_events(&filter).await?;
        self.summarize_all(events).await
    }

    /// One user.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    pub async fn user(&self, id: UserId) -> Result<User> {
        self.store.get_user(id).await
    }

    /// All users, oldest first.
    ///
    /// # Errors
    ///
    /// `Storage` if the backend fails.
    pub async fn users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }

    /// Number of attendees.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn attendee_count(&self, event_id: EventId) -> Result<u32> {
        self.store.count_attendees(event_id).await
    }

    /// Remaining spots; `None` when the event has no capacity.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn available_spots(&self, event_id: EventId) -> Result<Option<u32>> {
        Ok(self.event(event_id).await?.available_spots)
    }

    /// Whether `user_id` is attending `event_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if either side does not exist.
    pub async fn is_user_attending(&self, event_id: EventId, user_id: UserId) -> Result<bool> {
        self.store.is_attending(user_id, event_id).await
    }

    /// Attending users in join order.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn attendees(&self, event_id: EventId) -> Result<Vec<User>> {
        self.store.list_attendees(event_id).await
    }

    /// The user organizing `event_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event does not exist.
    pub async fn organizer(&self, event_id: EventId) -> Result<User> {
        let event = self.store.get_event(event_id).await?;
        self.store.get_user(event.organizer_id).await
    }

    /// Events organized by `user_id`, with counters.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    pub async fn organized_events(&self, user_id: UserId) -> Result<Vec<EventSummary>> {
        let events = self.store.list_organized_events(user_id).await?;
        self.summarize_all(events).await
    }

    /// Events `user_id` is attending, with counters.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    pub async fn attending_events(&self, user_id: UserId) -> Result<Vec<EventSummary>> {
        let events = self.store.list_attending_events(user_id).await?;
        self.summarize_all(events).await
    }

    /// Event with organizer, attendees and optional viewer attendance.
    ///
    /// # Errors
    ///
    /// `NotFound` if the event, or a supplied viewer, does not exist.
    pub async fn event_details(
        &self,
        event_id: EventId,
        viewer: Option<UserId>,
    ) -> Result<EventDetails> {
        let event = self.store.get_event(event_id).await?;
        let organizer = self.store.get_user(event.organizer_id).await?;
        let attendees = self.store.list_attendees(event_id).await?;

        let is_user_attending = match viewer {
            Some(user_id) => Some(self.store.is_attending(user_id, event_id).await?),
            None => None,
        };

        // Counters derive from the attendee list read above.
        let count = u32::try_from(attendees.len()).unwrap_or(u32::MAX);

        Ok(EventDetails {
            summary: EventSummary::new(event, count),
            organizer,
            attendees,
            is_user_attending,
        })
    }

    /// User with organized and attending events.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user does not exist.
    pub async fn user_details(&self, user_id: UserId) -> Result<UserDetails> {
        let user = self.store.get_user(user_id).await?;
        let organized_events = self.organized_events(user_id).await?;
        let attending_events = self.attending_events(user_id).await?;

        Ok(UserDetails {
            user,
            organized_events,
            attending_events,
        })
    }

    async fn summarize(&self, event: Event) -> Result<EventSummary> {
        let count = self.store.count_attendees(event.id).await?;
        Ok(EventSummary::new(event, count))
    }

    async fn summarize_all(&self, events: Vec<Event>) -> Result<Vec<EventSummary>> {
        let mut summaries = Vec::with_capacity(events.len());
        for event in events {
            summaries.push(self.summarize(event).await?);
        }
        Ok(summaries)
    }
}
