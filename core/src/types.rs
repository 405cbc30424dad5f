//! Domain types for the RSVP service.
//!
//! Identifiers are UUID newtypes, opaque to callers and stable for an
//! entity's lifetime. Entities carry only persisted data; counts and
//! availability are derived on read.

use crate::error::RsvpError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Maximum number of attendees for an event. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    ///
    /// # Errors
    ///
    /// Returns [`RsvpError::Validation`] if `value` is not a positive integer
    /// that fits in a `u32`.
    pub fn new(value: i64) -> Result<Self, RsvpError> {
        if value <= 0 {
            return Err(RsvpError::Validation(format!(
                "maxAttendees must be a positive integer, got {value}"
            )));
        }

        u32::try_from(value).map(Self).map_err(|_| {
            RsvpError::Validation(format!("maxAttendees {value} is too large"))
        })
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Capacity {
    type Error = RsvpError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u32 {
    fn from(capacity: Capacity) -> Self {
        capacity.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A registered user. Identity is supplied by the caller; no credentials
/// live here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user identifier
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address, unique across users (stored lower-cased)
    pub email: String,
    /// When the user was created
    pub created_at: DateTime<Utc>,
    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// A published event that users can RSVP to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Event title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Date and time the event takes place
    pub date: DateTime<Utc>,
    /// Where the event takes place
    pub location: String,
    /// Optional capacity; `None` means unlimited
    pub max_attendees: Option<Capacity>,
    /// The user who organizes the event (immutable)
    pub organizer_id: UserId,
    /// When the event was created
    pub created_at: DateTime<Utc>,
    /// When the event was last updated
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Spots left given the current attendee count.
    ///
    /// `None` when the event is uncapacitated. Saturates at zero.
    #[must_use]
    pub fn available_spots(&self, attendee_count: u32) -> Option<u32> {
        self.max_attendees
            .map(|capacity| capacity.value().saturating_sub(attendee_count))
    }

    /// Whether `attendee_count` has reached capacity.
    #[must_use]
    pub fn is_full(&self, attendee_count: u32) -> bool {
        self.max_attendees
            .is_some_and(|capacity| attendee_count >= capacity.value())
    }

    /// Whether the event took place before `now`.
    #[must_use]
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.date < now
    }
}

/// Membership of a user in an event's attendee set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// Attending user
    pub user_id: UserId,
    /// Event being attended
    pub event_id: EventId,
    /// When the RSVP was recorded (audit only)
    pub joined_at: DateTime<Utc>,
}

// ============================================================================
// Inputs
// ============================================================================

/// Fields for creating a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
}

/// Fields for creating an event. Capacity arrives unvalidated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    /// Event title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Date and time of the event; past dates are accepted
    pub date: DateTime<Utc>,
    /// Location
    pub location: String,
    /// Requested capacity, if any
    pub max_attendees: Option<i64>,
}

/// Filter for listing events. Results are ordered by date ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Only events dated at or after this instant
    pub starts_at_or_after: Option<DateTime<Utc>>,
    /// Only events organized by this user
    pub organizer_id: Option<UserId>,
}

impl EventFilter {
    /// No filtering: every event.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Events dated at or after `now`.
    #[must_use]
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        Self {
            starts_at_or_after: Some(now),
            organizer_id: None,
        }
    }

    /// Restrict to events organized by `organizer_id`.
    #[must_use]
    pub const fn organized_by(mut self, organizer_id: UserId) -> Self {
        self.organizer_id = Some(organizer_id);
        self
    }

    /// Whether `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let date_ok = self
            .starts_at_or_after
            .is_none_or(|start| event.date >= start);
        let organizer_ok = self
            .organizer_id
            .is_none_or(|organizer| event.organizer_id == organizer);
        date_ok && organizer_ok
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn event_with_capacity(capacity: Option<i64>) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Rust Meetup".to_string(),
            description: String::new(),
            date: now,
            location: "Berlin".to_string(),
            max_attendees: capacity.map(|c| Capacity::new(c).unwrap()),
            organizer_id: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn capacity_rejects_non_positive_values() {
        assert!(matches!(Capacity::new(0), Err(RsvpError::Validation(_))));
        assert!(matches!(Capacity::new(-3), Err(RsvpError::Validation(_))));
        assert!(matches!(
            Capacity::new(i64::from(u32::MAX) + 1),
            Err(RsvpError::Validation(_))
        ));
        assert_eq!(Capacity::new(25).unwrap().value(), 25);
    }

    #[test]
    fn capacity_deserialization_is_validated() {
        let ok: Capacity = serde_json::from_str("4").unwrap();
        assert_eq!(ok.value(), 4);
        assert!(serde_json::from_str::<Capacity>("0").is_err());
    }

    #[test]
    fn available_spots_is_none_without_capacity() {
        let event = event_with_capacity(None);
        assert_eq!(event.available_spots(1_000), None);
        assert!(!event.is_full(1_000));
    }

    #[test]
    fn available_spots_never_negative() {
        let event = event_with_capacity(Some(2));
        assert_eq!(event.available_spots(0), Some(2));
        assert_eq!(event.available_spots(2), Some(0));
        assert_eq!(event.available_spots(7), Some(0));
        assert!(event.is_full(2));
    }

    #[test]
    fn ids_parse_from_opaque_strings() {
        let id = EventId::new();
        let parsed: EventId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-an-id".parse::<UserId>().is_err());
    }

    #[test]
    fn entities_serialize_camel_case() {
        let event = event_with_capacity(Some(3));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["maxAttendees"], 3);
        assert_eq!(json["organizerId"], event.organizer_id.to_string());
        assert!(json.get("max_attendees").is_none());

        let uncapped = serde_json::to_value(event_with_capacity(None)).unwrap();
        assert!(uncapped["maxAttendees"].is_null());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn upcoming_filter_excludes_past_events() {
        let now = Utc::now();
        let mut event = event_with_capacity(None);

        event.date = now - Duration::hours(1);
        assert!(!EventFilter::upcoming(now).matches(&event));

        event.date = now;
        assert!(EventFilter::upcoming(now).matches(&event));
    }

    #[test]
    fn organizer_filter_matches_only_that_organizer() {
        let event = event_with_capacity(None);
        assert!(EventFilter::all().organized_by(event.organizer_id).matches(&event));
        assert!(!EventFilter::all().organized_by(UserId::new()).matches(&event));
    }

    proptest! {
        #[test]
        fn spots_plus_count_equals_capacity_until_full(capacity in 1i64..500, count in 0u32..500) {
            let event = event_with_capacity(Some(capacity));
            let spots = event.available_spots(count).unwrap();
            let capacity = u32::try_from(capacity).unwrap();
            if count <= capacity {
                prop_assert_eq!(spots + count, capacity);
            } else {
                prop_assert_eq!(spots, 0);
            }
        }
    }
}
