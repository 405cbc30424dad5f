//! # RSVP Testing
//!
//! Testing utilities and fixtures for the RSVP service.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations
//! - Entity fixtures that skip the service layer
//! - [`ContendedStore`], a store wrapper that injects transient contention
//! - proptest strategies for join/cancel sequences
//!
//! ## Example
//!
//! ```
//! use rsvp_testing::{fixtures, test_clock};
//! use rsvp_core::Clock;
//!
//! let organizer = fixtures::user("Ada");
//! let event = fixtures::event(organizer.id, test_clock().now(), Some(2));
//! assert_eq!(event.available_spots(1), Some(1));
//! ```

use chrono::{DateTime, Utc};
use rsvp_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use rsvp_testing::mocks::FixedClock;
    /// use rsvp_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Lets a test create an event in the future and then step past its date.
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Jump to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Entity builders for tests that talk to a store directly.
pub mod fixtures {
    use super::{DateTime, Utc};
    use rsvp_core::{Capacity, Event, EventId, User, UserId};

    /// A user named `name` with a derived, unique-per-name email.
    #[must_use]
    pub fn user(name: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            created_at: now,
            updated_at: now,
        }
    }

    /// An event organized by `organizer_id` on `date`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not positive.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn event(organizer_id: UserId, date: DateTime<Utc>, capacity: Option<i64>) -> Event {
        let now = Utc::now();
        Event {
            id: EventId::new(),
            title: "Fixture event".to_string(),
            description: "Created by rsvp-testing".to_string(),
            date,
            location: "Main hall".to_string(),
            max_attendees: capacity
                .map(|c| Capacity::new(c).expect("fixture capacity must be positive")),
            organizer_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Store wrappers for fault injection.
pub mod contention {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use rsvp_core::{
        Attendance, Capacity, EntityStore, Event, EventFilter, EventId, Result, RsvpError, User,
        UserId,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps a store and fails the next `n` attendance writes with
    /// [`RsvpError::Contention`] before delegating.
    ///
    /// An optional delay before each conditional insert widens race windows
    /// in concurrency tests.
    pub struct ContendedStore {
        inner: Arc<dyn EntityStore>,
        remaining_failures: AtomicUsize,
        attempts: AtomicUsize,
        write_delay: Option<Duration>,
    }

    impl std::fmt::Debug for ContendedStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ContendedStore")
                .field("remaining_failures", &self.remaining_failures)
                .field("attempts", &self.attempts)
                .field("write_delay", &self.write_delay)
                .finish_non_exhaustive()
        }
    }

    impl ContendedStore {
        /// Fail the next `failures` attendance writes.
        #[must_use]
        pub fn new(inner: Arc<dyn EntityStore>, failures: usize) -> Self {
            Self {
                inner,
                remaining_failures: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
                write_delay: None,
            }
        }

        /// Sleep for `delay` before every attendance write.
        #[must_use]
        pub const fn with_write_delay(mut self, delay: Duration) -> Self {
            self.write_delay = Some(delay);
            self
        }

        /// Attendance writes attempted so far, including injected failures.
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        async fn before_write(&self) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }

            let injected = self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(RsvpError::Contention(
                    "injected: could not serialize attendance write".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl EntityStore for ContendedStore {
        async fn get_user(&self, id: UserId) -> Result<User> {
            self.inner.get_user(id).await
        }

        async fn get_event(&self, id: EventId) -> Result<Event> {
            self.inner.get_event(id).await
        }

        async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
            self.inner.list_events(filter).await
        }

        async fn list_users(&self) -> Result<Vec<User>> {
            self.inner.list_users().await
        }

        async fn create_user(&self, user: User) -> Result<User> {
            self.inner.create_user(user).await
        }

        async fn create_event(&self, event: Event) -> Result<Event> {
            self.inner.create_event(event).await
        }

        async fn add_attendance(
            &self,
            user_id: UserId,
            event_id: EventId,
            joined_at: DateTime<Utc>,
        ) -> Result<Attendance> {
            self.before_write().await?;
            self.inner.add_attendance(user_id, event_id, joined_at).await
        }

        async fn add_attendance_within_capacity(
            &self,
            user_id: UserId,
            event_id: EventId,
            capacity: Capacity,
            joined_at: DateTime<Utc>,
        ) -> Result<Attendance> {
            self.before_write().await?;
            self.inner
                .add_attendance_within_capacity(user_id, event_id, capacity, joined_at)
                .await
        }

        async fn remove_attendance(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
            self.before_write().await?;
            self.inner.remove_attendance(user_id, event_id).await
        }

        async fn count_attendees(&self, event_id: EventId) -> Result<u32> {
            self.inner.count_attendees(event_id).await
        }

        async fn is_attending(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
            self.inner.is_attending(user_id, event_id).await
        }

        async fn list_attendees(&self, event_id: EventId) -> Result<Vec<User>> {
            self.inner.list_attendees(event_id).await
        }

        async fn list_organized_events(&self, user_id: UserId) -> Result<Vec<Event>> {
            self.inner.list_organized_events(user_id).await
        }

        async fn list_attending_events(&self, user_id: UserId) -> Result<Vec<Event>> {
            self.inner.list_attending_events(user_id).await
        }

        async fn ping(&self) -> Result<()> {
            self.inner.ping().await
        }
    }
}

/// Tracing setup for tests.
pub mod helpers {
    /// Route `tracing` output through the test harness writer.
    ///
    /// Safe to call from every test; only the first call installs a subscriber.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities.
pub mod properties {
    use proptest::prelude::*;

    /// One step of a join/cancel sequence against a shared event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum RsvpOp {
        /// User at this index joins
        Join(usize),
        /// User at this index cancels
        Cancel(usize),
    }

    /// Sequences of up to `max_len` operations over `users` users.
    pub fn rsvp_ops(users: usize, max_len: usize) -> impl Strategy<Value = Vec<RsvpOp>> {
        let op = prop_oneof![
            3 => (0..users).prop_map(RsvpOp::Join),
            1 => (0..users).prop_map(RsvpOp::Cancel),
        ];
        proptest::collection::vec(op, 0..max_len)
    }
}

// Re-export commonly used items
pub use contention::ContendedStore;
pub use mocks::{FixedClock, ManualClock, test_clock};
