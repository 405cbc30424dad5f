//! # RSVP Runtime
//!
//! Write and read paths for the RSVP service.
//!
//! ## Core Components
//!
//! - **`RsvpService`**: create users and events, join and cancel with
//!   capacity enforcement
//! - **`QueryResolver`**: entity lookups and derived fields (attendee count,
//!   available spots, viewer attendance)
//! - **`EventLocks`**: per-event mutual exclusion for joins
//! - **`InMemoryEntityStore`**: process-local [`EntityStore`] implementation
//!
//! ## Example
//!
//! ```
//! use rsvp_core::{NewEvent, NewUser, SystemClock, Utc};
//! use rsvp_runtime::{InMemoryEntityStore, QueryResolver, RsvpService, RsvpStatus};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(InMemoryEntityStore::new());
//! let clock = Arc::new(SystemClock);
//! let service = RsvpService::new(store.clone(), clock.clone());
//! let queries = QueryResolver::new(store, clock);
//!
//! let ada = service
//!     .create_user(NewUser { name: "Ada".into(), email: "ada@example.com".into() })
//!     .await?;
//! let event = service
//!     .create_event(ada.id, NewEvent {
//!         title: "Rust Meetup".into(),
//!         description: String::new(),
//!         date: Utc::now(),
//!         location: "Berlin".into(),
//!         max_attendees: Some(10),
//!     })
//!     .await?;
//!
//! let outcome = service.join_event(ada.id, event.id).await?;
//! assert_eq!(outcome.status, RsvpStatus::Joined);
//! assert_eq!(queries.event(event.id).await?.available_spots, Some(9));
//! # Ok::<(), rsvp_core::RsvpError>(())
//! # }).unwrap();
//! ```

pub use rsvp_core::EntityStore;

/// Per-event mutual exclusion
pub mod locks;

/// In-memory entity store
pub mod memory;

/// Prometheus-style counters for domain operations
pub mod metrics;

/// Read paths and derived fields
pub mod query;

/// Retry logic with exponential backoff
pub mod retry;

/// Domain service enforcing RSVP invariants
pub mod service;

pub use locks::{EventLockGuard, EventLocks};
pub use memory::InMemoryEntityStore;
pub use query::{EventDetails, EventSummary, QueryResolver, UserDetails};
pub use retry::RetryPolicy;
pub use service::{RsvpOutcome, RsvpService, RsvpStatus, ServiceConfig};
