//! # RSVP Core
//!
//! Domain types and contracts for the RSVP service.
//!
//! Organizers publish events with an optional capacity; users join (RSVP) or
//! cancel. This crate defines the vocabulary every other crate speaks:
//!
//! - **Types**: [`User`], [`Event`], [`Attendance`] and their identifiers
//! - **Errors**: the [`RsvpError`] taxonomy shared by stores, services and the API
//! - **Store**: the [`EntityStore`] trait, the only seam allowed to mutate state
//! - **Environment**: injected dependencies such as the [`Clock`]
//!
//! ## Layering
//!
//! ```text
//! API Surface ──► Domain Service (writes) ──┐
//!             └─► Query Resolution (reads) ─┴──► EntityStore
//! ```
//!
//! Derived fields (attendee count, available spots) are never stored here.
//! They are computed on read from the attendance relation.

pub mod environment;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use environment::{Clock, SystemClock};
pub use error::{EntityKind, Result, RsvpError};
pub use store::EntityStore;
pub use types::{
    Attendance, Capacity, Event, EventFilter, EventId, NewEvent, NewUser, User, UserId,
};
