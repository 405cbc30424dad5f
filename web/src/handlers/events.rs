//! Event endpoints.
//!
//! - GET /api/events - All events with counters
//! - GET /api/events/upcoming - Events dated now or later
//! - GET /api/events/:id - Event details (optional `viewerId`)
//! - GET /api/events/:id/attendees - Attending users
//! - GET /api/events/:id/attendees/:user_id - Whether a user attends
//! - POST /api/events - Create an event

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rsvp_core::{Event, EventId, NewEvent, User, UserId};
use rsvp_runtime::{EventDetails, EventSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to create a new event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Organizing user
    pub organizer_id: UserId,
    /// Event title
    pub title: String,
    /// Event description
    #[serde(default)]
    pub description: String,
    /// When the event takes place (RFC 3339)
    pub date: DateTime<Utc>,
    /// Venue
    #[serde(default)]
    pub location: String,
    /// Optional capacity; omitted or null means unlimited
    #[serde(default)]
    pub max_attendees: Option<i64>,
}

/// Query parameters for event details.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    /// User whose attendance should be reported
    pub viewer_id: Option<Uuid>,
}

/// Attendance flag for one user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    /// Event queried
    pub event_id: EventId,
    /// User queried
    pub user_id: UserId,
    /// Whether the user is attending
    pub is_user_attending: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// List all events, ordered by date.
///
/// ```bash
/// curl http://localhost:8080/api/events
/// ```
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    Ok(Json(state.queries.events().await?))
}

/// List events dated now or later, soonest first.
pub async fn upcoming_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    Ok(Json(state.queries.upcoming_events().await?))
}

/// Get event details.
///
/// With `viewerId`, the response includes `isUserAttending`.
///
/// ```bash
/// curl "http://localhost:8080/api/events/<id>?viewerId=<user-id>"
/// ```
pub async fn get_event(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppQuery(query): AppQuery<EventQuery>,
) -> Result<Json<EventDetails>, AppError> {
    let details = state
        .queries
        .event_details(EventId::from_uuid(id), query.viewer_id.map(UserId::from_uuid))
        .await?;
    Ok(Json(details))
}

/// List users attending an event, in join order.
pub async fn list_attendees(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.queries.attendees(EventId::from_uuid(id)).await?))
}

/// Whether a user is attending an event.
pub async fn attendee_status(
    State(state): State<AppState>,
    AppPath((event_id, user_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<AttendanceResponse>, AppError> {
    let (event_id, user_id) = (EventId::from_uuid(event_id), UserId::from_uuid(user_id));
    let is_user_attending = state.queries.is_user_attending(event_id, user_id).await?;

    Ok(Json(AttendanceResponse {
        event_id,
        user_id,
        is_user_attending,
    }))
}

/// Create a new event.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events \
///   -H "Content-Type: application/json" \
///   -d '{
///     "organizerId": "550e8400-e29b-41d4-a716-446655440000",
///     "title": "Rust Meetup",
///     "date": "2025-06-01T18:00:00Z",
///     "location": "Community Hall",
///     "maxAttendees": 40
///   }'
/// ```
pub async fn create_event(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state
        .service
        .create_event(
            request.organizer_id,
            NewEvent {
                title: request.title,
                description: request.description,
                date: request.date,
                location: request.location,
                max_attendees: request.max_attendees,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}
