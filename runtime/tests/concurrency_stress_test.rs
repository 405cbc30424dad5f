//! Concurrency stress tests for last-spot scenarios.
//!
//! These tests verify that under concurrent joins the service never admits
//! more attendees than an event's capacity, and that joins on different
//! events do not interfere with each other.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use chrono::Duration;
use rsvp_core::{Clock, EntityStore, NewEvent, NewUser, RsvpError, User, UserId};
use rsvp_runtime::{InMemoryEntityStore, QueryResolver, RsvpService, RsvpStatus};
use rsvp_testing::{ContendedStore, helpers::init_tracing, test_clock};
use std::sync::Arc;

async fn create_users(service: &RsvpService, prefix: &str, count: usize) -> Vec<User> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(
            service
                .create_user(NewUser {
                    name: format!("{prefix} {i}"),
                    email: format!("{prefix}{i}@example.com"),
                })
                .await
                .unwrap(),
        );
    }
    users
}

fn new_event(capacity: Option<i64>) -> NewEvent {
    NewEvent {
        title: "Last spot".to_string(),
        description: "Stress test".to_string(),
        date: test_clock().now() + Duration::days(7),
        location: "Room 1".to_string(),
        max_attendees: capacity,
    }
}

/// Spawn one join per user and collect the results.
async fn join_all(
    service: &RsvpService,
    users: &[User],
    event_id: rsvp_core::EventId,
) -> Vec<Result<rsvp_runtime::RsvpOutcome, RsvpError>> {
    let handles: Vec<_> = users
        .iter()
        .map(|user| {
            let service = service.clone();
            let user_id = user.id;
            tokio::spawn(async move { service.join_event(user_id, event_id).await })
        })
        .collect();

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.expect("join task panicked"))
        .collect()
}

/// Test: capacity + 5 concurrent joins for an event with capacity 10.
///
/// Exactly 10 joins succeed, the remaining 5 fail with `EventFull`, and the
/// derived counters agree with the attendance relation.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_plus_five_concurrent_joins() {
    init_tracing();
    let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let clock: Arc<dyn Clock> = Arc::new(test_clock());
    let service = RsvpService::new(Arc::clone(&store), Arc::clone(&clock));
    let queries = QueryResolver::new(Arc::clone(&store), clock);

    let organizer = create_users(&service, "organizer", 1).await.remove(0);
    let event = service
        .create_event(organizer.id, new_event(Some(10)))
        .await
        .unwrap();
    let users = create_users(&service, "guest", 15).await;

    let results = join_all(&service, &users, event.id).await;

    let joined = results
        .iter()
        .filter(|r| matches!(r, Ok(o) if o.status == RsvpStatus::Joined))
        .count();
    let full = results
        .iter()
        .filter(|r| matches!(r, Err(RsvpError::EventFull { capacity: 10, .. })))
        .count();

    assert_eq!(joined, 10, "exactly capacity joins must succeed");
    assert_eq!(full, 5, "the rest must be refused as full");

    let summary = queries.event(event.id).await.unwrap();
    assert_eq!(summary.attendee_count, 10);
    assert_eq!(summary.available_spots, Some(0));
    assert_eq!(queries.attendees(event.id).await.unwrap().len(), 10);
}

/// Test: 100 concurrent joins for a single spot, with a slow store.
///
/// The write delay keeps every join inside its check-and-insert window long
/// enough that an unserialized implementation would overshoot.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_last_spot_concurrency_100_requests() {
    let inner: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let store: Arc<dyn EntityStore> = Arc::new(
        ContendedStore::new(inner, 0).with_write_delay(std::time::Duration::from_millis(1)),
    );
    let service = RsvpService::new(Arc::clone(&store), Arc::new(test_clock()));

    let organizer = create_users(&service, "organizer", 1).await.remove(0);
    let event = service
        .create_event(organizer.id, new_event(Some(1)))
        .await
        .unwrap();
    let users = create_users(&service, "guest", 100).await;

    let results = join_all(&service, &users, event.id).await;

    let winners: Vec<UserId> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|o| o.user_id)
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(store.count_attendees(event.id).await.unwrap(), 1);
    assert!(store.is_attending(winners[0], event.id).await.unwrap());
}

/// Test: the same user hammering join concurrently is recorded once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_joins_are_idempotent() {
    let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let service = RsvpService::new(Arc::clone(&store), Arc::new(test_clock()));

    let organizer = create_users(&service, "organizer", 1).await.remove(0);
    let event = service
        .create_event(organizer.id, new_event(Some(3)))
        .await
        .unwrap();
    let guest = create_users(&service, "guest", 1).await.remove(0);

    let same_user = vec![guest.clone(); 20];
    let results = join_all(&service, &same_user, event.id).await;

    assert!(results.iter().all(Result::is_ok));
    let joined = results
        .iter()
        .filter(|r| matches!(r, Ok(o) if o.status == RsvpStatus::Joined))
        .count();
    assert_eq!(joined, 1);
    assert_eq!(store.count_attendees(event.id).await.unwrap(), 1);
}

/// Test: joins on independent events all succeed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joins_on_different_events_are_independent() {
    let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let service = RsvpService::new(Arc::clone(&store), Arc::new(test_clock()));

    let organizer = create_users(&service, "organizer", 1).await.remove(0);
    let guest = create_users(&service, "guest", 1).await.remove(0);

    let mut events = Vec::new();
    for _ in 0..20 {
        events.push(
            service
                .create_event(organizer.id, new_event(Some(1)))
                .await
                .unwrap(),
        );
    }

    let handles: Vec<_> = events
        .iter()
        .map(|event| {
            let service = service.clone();
            let (user_id, event_id) = (guest.id, event.id);
            tokio::spawn(async move { service.join_event(user_id, event_id).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        assert_eq!(result.unwrap().unwrap().status, RsvpStatus::Joined);
    }
    assert_eq!(
        store.list_attending_events(guest.id).await.unwrap().len(),
        20
    );
}

/// Test: joins and cancels interleaved concurrently never exceed capacity.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_joins_and_cancels_respect_capacity() {
    let store: Arc<dyn EntityStore> = Arc::new(InMemoryEntityStore::new());
    let service = RsvpService::new(Arc::clone(&store), Arc::new(test_clock()));

    let organizer = create_users(&service, "organizer", 1).await.remove(0);
    let event = service
        .create_event(organizer.id, new_event(Some(5)))
        .await
        .unwrap();
    let users = create_users(&service, "guest", 30).await;

    let handles: Vec<_> = users
        .iter()
        .enumerate()
        .map(|(i, user)| {
            let service = service.clone();
            let (user_id, event_id) = (user.id, event.id);
            tokio::spawn(async move {
                let _ = service.join_event(user_id, event_id).await;
                if i % 2 == 0 {
                    service.cancel_rsvp(user_id, event_id).await.unwrap();
                }
            })
        })
        .collect();
    futures::future::join_all(handles).await;

    let count = store.count_attendees(event.id).await.unwrap();
    assert!(count <= 5, "capacity exceeded: {count}");
    for (i, user) in users.iter().enumerate() {
        if i % 2 == 0 {
            assert!(!store.is_attending(user.id, event.id).await.unwrap());
        }
    }
}
