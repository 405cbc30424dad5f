//! Error taxonomy for the RSVP service.
//!
//! One enum is shared by the store, the domain service and the API surface.
//! Each layer decides what to do with a variant:
//!
//! - `NotFound`, `Validation`, `EmailTaken` → surfaced as request errors
//! - `EventFull`, `EventClosed` → structured mutation failures
//! - `AlreadyExists` → store-internal, absorbed into idempotent success
//! - `Contention` → retried by the domain service, then surfaced as transient
//! - `Storage` → unexpected backend failure

use crate::types::{EventId, UserId};
use std::fmt;
use thiserror::Error;

/// Result type alias for RSVP operations.
pub type Result<T> = std::result::Result<T, RsvpError>;

/// Kind of entity referenced by a [`RsvpError::NotFound`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A user
    User,
    /// An event
    Event,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "User"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// Errors produced by RSVP operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RsvpError {
    /// Referenced user or event does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound {
        /// Which kind of entity was missing
        entity: EntityKind,
        /// The identifier that was looked up
        id: String,
    },

    /// The event's capacity is already met.
    #[error("Event {event_id} is full ({capacity} attendees)")]
    EventFull {
        /// The full event
        event_id: EventId,
        /// Its capacity
        capacity: u32,
    },

    /// The attendance pair already exists. Never leaves the domain service.
    #[error("User {user_id} is already attending event {event_id}")]
    AlreadyExists {
        /// Attending user
        user_id: UserId,
        /// Event attended
        event_id: EventId,
    },

    /// Malformed creation input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another user already registered this email.
    #[error("Email {0} is already registered")]
    EmailTaken(String),

    /// The event has already taken place and the service refuses new RSVPs.
    #[error("Event {event_id} has already taken place")]
    EventClosed {
        /// The past event
        event_id: EventId,
    },

    /// Transient failure to apply an atomic check-and-insert.
    #[error("Contention: {0}")]
    Contention(String),

    /// Backend failure unrelated to the request.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RsvpError {
    /// `NotFound` for a user.
    #[must_use]
    pub fn user_not_found(id: UserId) -> Self {
        Self::NotFound {
            entity: EntityKind::User,
            id: id.to_string(),
        }
    }

    /// `NotFound` for an event.
    #[must_use]
    pub fn event_not_found(id: EventId) -> Self {
        Self::NotFound {
            entity: EntityKind::Event,
            id: id.to_string(),
        }
    }

    /// Whether the domain service should retry the failed unit of work.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Contention(_))
    }
}
