//! In-memory entity store.
//!
//! All tables live behind one `tokio::sync::RwLock`. Reads share the lock;
//! every mutation (including the conditional attendance insert) takes the
//! write lock, so each one is atomic with respect to all others. Used by the
//! dev server and by tests; durability comes from `rsvp-postgres`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_core::{
    Attendance, Capacity, EntityStore, Event, EventFilter, EventId, Result, RsvpError, User,
    UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    events: HashMap<EventId, Event>,
    // Per event, in join order.
    attendance: HashMap<EventId, Vec<Attendance>>,
}

impl Tables {
    fn user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or_else(|| RsvpError::user_not_found(id))
    }

    fn event(&self, id: EventId) -> Result<&Event> {
        self.events
            .get(&id)
            .ok_or_else(|| RsvpError::event_not_found(id))
    }

    fn attendees_of(&self, event_id: EventId) -> &[Attendance] {
        self.attendance.get(&event_id).map_or(&[], Vec::as_slice)
    }

    fn count(&self, event_id: EventId) -> u32 {
        u32::try_from(self.attendees_of(event_id).len()).unwrap_or(u32::MAX)
    }

    fn contains(&self, user_id: UserId, event_id: EventId) -> bool {
        self.attendees_of(event_id)
            .iter()
            .any(|a| a.user_id == user_id)
    }

    fn insert(
        &mut self,
        user_id: UserId,
        event_id: EventId,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        if self.contains(user_id, event_id) {
            return Err(RsvpError::AlreadyExists { user_id, event_id });
        }

        let attendance = Attendance {
            user_id,
            event_id,
            joined_at,
        };
        self.attendance
            .entry(event_id)
            .or_default()
            .push(attendance.clone());
        Ok(attendance)
    }

    fn sorted(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        events
    }
}

/// Entity store backed by process memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEntityStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryEntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_user(&self, id: UserId) -> Result<User> {
        self.tables.read().await.user(id).cloned()
    }

    async fn get_event(&self, id: EventId) -> Result<Event> {
        self.tables.read().await.event(id).cloned()
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let tables = self.tables.read().await;
        let events = tables
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        Ok(Tables::sorted(events))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn create_user(&self, user: User) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.emails.contains_key(&user.email) {
            return Err(RsvpError::EmailTaken(user.email));
        }

        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_event(&self, event: Event) -> Result<Event> {
        let mut tables = self.tables.write().await;
        tables.user(event.organizer_id)?;
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn add_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        tables.event(event_id)?;
        tables.insert(user_id, event_id, joined_at)
    }

    async fn add_attendance_within_capacity(
        &self,
        user_id: UserId,
        event_id: EventId,
        capacity: Capacity,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        let mut tables = self.tables.write().await;
        tables.user(user_id)?;
        tables.event(event_id)?;

        if tables.contains(user_id, event_id) {
            return Err(RsvpError::AlreadyExists { user_id, event_id });
        }
        if tables.count(event_id) >= capacity.value() {
            return Err(RsvpError::EventFull {
                event_id,
                capacity: capacity.value(),
            });
        }

        tables.insert(user_id, event_id, joined_at)
    }

    async fn remove_attendance(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.attendance.get_mut(&event_id) else {
            return Ok(false);
        };

        let before = rows.len();
        rows.retain(|a| a.user_id != user_id);
        Ok(rows.len() < before)
    }

    async fn count_attendees(&self, event_id: EventId) -> Result<u32> {
        let tables = self.tables.read().await;
        tables.event(event_id)?;
        Ok(tables.count(event_id))
    }

    async fn is_attending(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
        let tables = self.tables.read().await;
        tables.user(user_id)?;
        tables.event(event_id)?;
        Ok(tables.contains(user_id, event_id))
    }

    async fn list_attendees(&self, event_id: EventId) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        tables.event(event_id)?;
        tables
            .attendees_of(event_id)
            .iter()
            .map(|a| tables.user(a.user_id).cloned())
            .collect()
    }

    async fn list_organized_events(&self, user_id: UserId) -> Result<Vec<Event>> {
        let tables = self.tables.read().await;
        tables.user(user_id)?;
        let filter = EventFilter::all().organized_by(user_id);
        let events = tables
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        Ok(Tables::sorted(events))
    }

    async fn list_attending_events(&self, user_id: UserId) -> Result<Vec<Event>> {
        let tables = self.tables.read().await;
        tables.user(user_id)?;
        let events = tables
            .attendance
            .iter()
            .filter(|(_, rows)| rows.iter().any(|a| a.user_id == user_id))
            .map(|(event_id, _)| tables.event(*event_id).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Tables::sorted(events))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
