//! Row types and their conversion into domain entities.

use chrono::{DateTime, Utc};
use rsvp_core::{Capacity, Event, EventId, RsvpError, User, UserId};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub starts_at: DateTime<Utc>,
    pub location: String,
    pub max_attendees: Option<i64>,
    pub organizer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = RsvpError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let max_attendees = row
            .max_attendees
            .map(Capacity::new)
            .transpose()
            .map_err(|e| RsvpError::Storage(format!("corrupt capacity on event {}: {e}", row.id)))?;

        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            date: row.starts_at,
            location: row.location,
            max_attendees,
            organizer_id: UserId::from_uuid(row.organizer_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn events(rows: Vec<EventRow>) -> Result<Vec<Event>, RsvpError> {
    rows.into_iter().map(Event::try_from).collect()
}

/// Attendee counts arrive as `BIGINT`.
pub(crate) fn count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
