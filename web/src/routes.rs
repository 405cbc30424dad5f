//! Router configuration.

use crate::handlers::{events, health_check, readiness_check, rsvp, users};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the complete Axum router.
///
/// - `/health`, `/ready`: operational checks
/// - `/api/events...`, `/api/users...`: queries and mutations
///
/// Every route runs inside the correlation ID, trace and CORS layers.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/upcoming", get(events::upcoming_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/attendees", get(events::list_attendees))
        .route(
            "/events/:id/attendees/:user_id",
            get(events::attendee_status),
        )
        // RSVP mutations
        .route("/events/:id/rsvp", post(rsvp::rsvp_to_event))
        .route("/events/:id/cancel", post(rsvp::cancel_rsvp))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
