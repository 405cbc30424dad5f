//! `PostgresEntityStore` - durable storage for users, events and attendance.

use crate::error::{foreign_key_violation, storage, unique_violation};
use crate::rows::{self, EventRow, UserRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_core::{
    Attendance, Capacity, EntityStore, Event, EventFilter, EventId, Result, RsvpError, User,
    UserId,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;

const EVENT_COLUMNS: &str = "e.id, e.title, e.description, e.starts_at, e.location, \
     e.max_attendees, e.organizer_id, e.created_at, e.updated_at";

/// Connection settings for [`PostgresEntityStore::connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    /// Connection URL
    pub url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Minimum pool connections
    pub min_connections: u32,
    /// How long to wait for a pooled connection
    pub connect_timeout: Duration,
    /// How long a join waits for an event's row lock before reporting contention
    pub lock_timeout: Duration,
}

impl PostgresConfig {
    /// Default pool settings for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            lock_timeout: Duration::from_secs(2),
        }
    }
}

/// `PostgreSQL`-backed [`EntityStore`].
///
/// Conditional attendance inserts run in a transaction that locks the event
/// row (`SELECT ... FOR UPDATE`), so concurrent joins for one event serialize
/// across every process sharing the database while joins for other events
/// proceed in parallel.
#[derive(Clone, Debug)]
pub struct PostgresEntityStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresEntityStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(2),
        }
    }

    /// Override the row-lock timeout used by conditional inserts.
    #[must_use]
    pub const fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Open a connection pool.
    ///
    /// # Errors
    ///
    /// `Storage` if the database cannot be reached.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| RsvpError::Storage(format!("Failed to connect to database: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            lock_timeout_ms = config.lock_timeout.as_millis(),
            "Connected to PostgreSQL"
        );
        Ok(Self::from_pool(pool).with_lock_timeout(config.lock_timeout))
    }

    /// Run embedded schema migrations.
    ///
    /// # Errors
    ///
    /// `Storage` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RsvpError::Storage(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn user_exists(&self, id: UserId) -> Result<()> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage("Failed to look up user", e))?;

        if exists {
            Ok(())
        } else {
            Err(RsvpError::user_not_found(id))
        }
    }

    async fn event_exists(&self, id: EventId) -> Result<()> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage("Failed to look up event", e))?;

        if exists {
            Ok(())
        } else {
            Err(RsvpError::event_not_found(id))
        }
    }

    /// Re-check and insert inside an open transaction holding the event lock.
    async fn insert_locked(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        event_id: EventId,
        capacity: Capacity,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        let (user_exists, attending, count): (bool, bool, i64) = sqlx::query_as(
            r"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE id = $1),
                EXISTS (SELECT 1 FROM attendances WHERE user_id = $1 AND event_id = $2),
                (SELECT COUNT(*) FROM attendances WHERE event_id = $2)
            ",
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| storage("Failed to check attendance", e))?;

        if !user_exists {
            return Err(RsvpError::user_not_found(user_id));
        }
        if attending {
            return Err(RsvpError::AlreadyExists { user_id, event_id });
        }
        if rows::count(count) >= capacity.value() {
            return Err(RsvpError::EventFull {
                event_id,
                capacity: capacity.value(),
            });
        }

        sqlx::query("INSERT INTO attendances (user_id, event_id, joined_at) VALUES ($1, $2, $3)")
            .bind(user_id.as_uuid())
            .bind(event_id.as_uuid())
            .bind(joined_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| attendance_insert_error(e, user_id, event_id))?;

        Ok(Attendance {
            user_id,
            event_id,
            joined_at,
        })
    }
}

fn attendance_insert_error(err: sqlx::Error, user_id: UserId, event_id: EventId) -> RsvpError {
    if unique_violation(&err).is_some() {
        return RsvpError::AlreadyExists { user_id, event_id };
    }
    match foreign_key_violation(&err) {
        Some("attendances_user_id_fkey") => RsvpError::user_not_found(user_id),
        Some(_) => RsvpError::event_not_found(event_id),
        None => storage("Failed to insert attendance", err),
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn get_user(&self, id: UserId) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("Failed to get user", e))?
        .map(User::from)
        .ok_or_else(|| RsvpError::user_not_found(id))
    }

    async fn get_event(&self, id: EventId) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("Failed to get event", e))?
        .ok_or_else(|| RsvpError::event_not_found(id))?;

        Event::try_from(row)
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r"
            SELECT {EVENT_COLUMNS} FROM events e
            WHERE ($1::timestamptz IS NULL OR e.starts_at >= $1)
              AND ($2::uuid IS NULL OR e.organizer_id = $2)
            ORDER BY e.starts_at, e.created_at
            "
        ))
        .bind(filter.starts_at_or_after)
        .bind(filter.organizer_id.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("Failed to list events", e))?;

        rows::events(rows)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("Failed to list users", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_user(&self, user: User) -> Result<User> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if unique_violation(&e) == Some("users_email_key") {
                return RsvpError::EmailTaken(user.email.clone());
            }
            storage("Failed to create user", e)
        })?;

        Ok(user)
    }

    async fn create_event(&self, event: Event) -> Result<Event> {
        sqlx::query(
            r"
            INSERT INTO events (
                id, title, description, starts_at, location,
                max_attendees, organizer_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(event.max_attendees.map(|c| i64::from(c.value())))
        .bind(event.organizer_id.as_uuid())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if foreign_key_violation(&e).is_some() {
                return RsvpError::user_not_found(event.organizer_id);
            }
            storage("Failed to create event", e)
        })?;

        Ok(event)
    }

    async fn add_attendance(
        &self,
        user_id: UserId,
        event_id: EventId,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        sqlx::query("INSERT INTO attendances (user_id, event_id, joined_at) VALUES ($1, $2, $3)")
            .bind(user_id.as_uuid())
            .bind(event_id.as_uuid())
            .bind(joined_at)
            .execute(&self.pool)
            .await
            .map_err(|e| attendance_insert_error(e, user_id, event_id))?;

        Ok(Attendance {
            user_id,
            event_id,
            joined_at,
        })
    }

    #[tracing::instrument(skip(self), fields(%user_id, %event_id, %capacity))]
    async fn add_attendance_within_capacity(
        &self,
        user_id: UserId,
        event_id: EventId,
        capacity: Capacity,
        joined_at: DateTime<Utc>,
    ) -> Result<Attendance> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage("Failed to begin transaction", e))?;

        let lock_timeout = format!("{}ms", self.lock_timeout.as_millis());
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(&lock_timeout)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage("Failed to set lock timeout", e))?;

        let locked: Option<(uuid::Uuid,)> =
            sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| storage("Failed to lock event", e))?;
        if locked.is_none() {
            return Err(RsvpError::event_not_found(event_id));
        }

        // Dropping the transaction on an early return rolls it back.
        let attendance = Self::insert_locked(&mut tx, user_id, event_id, capacity, joined_at).await?;

        tx.commit()
            .await
            .map_err(|e| storage("Failed to commit attendance", e))?;

        tracing::debug!("Attendance committed under event lock");
        Ok(attendance)
    }

    async fn remove_attendance(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendances WHERE user_id = $1 AND event_id = $2")
            .bind(user_id.as_uuid())
            .bind(event_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| storage("Failed to remove attendance", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_attendees(&self, event_id: EventId) -> Result<u32> {
        let row: Option<(i64,)> = sqlx::query_as(
            r"
            SELECT (SELECT COUNT(*) FROM attendances a WHERE a.event_id = e.id)
            FROM events e WHERE e.id = $1
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage("Failed to count attendees", e))?;

        row.map(|(count,)| rows::count(count))
            .ok_or_else(|| RsvpError::event_not_found(event_id))
    }

    async fn is_attending(&self, user_id: UserId, event_id: EventId) -> Result<bool> {
        let (user_exists, event_exists, attending): (bool, bool, bool) = sqlx::query_as(
            r"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE id = $1),
                EXISTS (SELECT 1 FROM events WHERE id = $2),
                EXISTS (SELECT 1 FROM attendances WHERE user_id = $1 AND event_id = $2)
            ",
        )
        .bind(user_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage("Failed to check attendance", e))?;

        if !user_exists {
            return Err(RsvpError::user_not_found(user_id));
        }
        if !event_exists {
            return Err(RsvpError::event_not_found(event_id));
        }
        Ok(attending)
    }

    async fn list_attendees(&self, event_id: EventId) -> Result<Vec<User>> {
        self.event_exists(event_id).await?;

        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT u.id, u.name, u.email, u.created_at, u.updated_at
            FROM attendances a
            JOIN users u ON u.id = a.user_id
            WHERE a.event_id = $1
            ORDER BY a.joined_at, a.seq
            ",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("Failed to list attendees", e))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_organized_events(&self, user_id: UserId) -> Result<Vec<Event>> {
        self.user_exists(user_id).await?;
        self.list_events(&EventFilter::all().organized_by(user_id))
            .await
    }

    async fn list_attending_events(&self, user_id: UserId) -> Result<Vec<Event>> {
        self.user_exists(user_id).await?;

        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r"
            SELECT {EVENT_COLUMNS}
            FROM attendances a
            JOIN events e ON e.id = a.event_id
            WHERE a.user_id = $1
            ORDER BY e.starts_at, e.created_at
            "
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage("Failed to list attending events", e))?;

        rows::events(rows)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| storage("Database ping failed", e))?;
        Ok(())
    }
}
