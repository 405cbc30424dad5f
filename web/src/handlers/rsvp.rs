//! RSVP mutation endpoints.
//!
//! - POST /api/events/:id/rsvp - Join an event
//! - POST /api/events/:id/cancel - Withdraw an RSVP
//!
//! Both answer with a [`MutationResponse`]. Business refusals (event full,
//! event closed, contention that outlived the retry budget) are reported as
//! `success: false` with HTTP 200; unknown identifiers are 404s.

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::CorrelationId;
use crate::state::AppState;
use axum::{Json, extract::State};
use rsvp_core::{EventId, Result as RsvpResult, RsvpError, UserId};
use rsvp_runtime::RsvpOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of a join or cancel request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpRequest {
    /// Acting user
    pub user_id: UserId,
}

/// Result of a join or cancel.
///
/// On success the outcome fields (`eventId`, `userId`, `status`,
/// `attendeeCount`, `availableSpots`) are inlined.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    /// Whether the call succeeded (idempotent no-ops count as success)
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Failure reasons; empty on success
    pub errors: Vec<String>,
    /// What happened, when the call succeeded
    #[serde(flatten)]
    pub outcome: Option<RsvpOutcome>,
}

impl MutationResponse {
    fn succeeded(outcome: RsvpOutcome) -> Self {
        Self {
            success: true,
            message: outcome.status.message().to_string(),
            errors: Vec::new(),
            outcome: Some(outcome),
        }
    }

    fn refused(message: &str, error: &RsvpError) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            errors: vec![error.to_string()],
            outcome: None,
        }
    }

    /// Fold a service result into a payload, or a request error.
    fn from_result(result: RsvpResult<RsvpOutcome>) -> Result<Self, AppError> {
        match result {
            Ok(outcome) => Ok(Self::succeeded(outcome)),
            Err(err @ RsvpError::EventFull { .. }) => Ok(Self::refused("Event is full", &err)),
            Err(err @ RsvpError::EventClosed { .. }) => {
                Ok(Self::refused("Event has already taken place", &err))
            }
            Err(err @ RsvpError::Contention(_)) => {
                Ok(Self::refused("Event is busy, please try again", &err))
            }
            Err(err) => Err(err.into()),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// RSVP a user to an event.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/events/<id>/rsvp \
///   -H "Content-Type: application/json" \
///   -d '{"userId": "550e8400-e29b-41d4-a716-446655440000"}'
/// ```
pub async fn rsvp_to_event(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(request): AppJson<RsvpRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let result = state.service.join_event(request.user_id, event_id).await;

    if let Err(error) = &result {
        tracing::debug!(
            %correlation_id,
            %event_id,
            user_id = %request.user_id,
            %error,
            "RSVP not applied"
        );
    }

    MutationResponse::from_result(result).map(Json)
}

/// Cancel a user's RSVP.
pub async fn cancel_rsvp(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AppPath(event_id): AppPath<Uuid>,
    AppJson(request): AppJson<RsvpRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let event_id = EventId::from_uuid(event_id);
    let result = state.service.cancel_rsvp(request.user_id, event_id).await;

    if let Err(error) = &result {
        tracing::debug!(
            %correlation_id,
            %event_id,
            user_id = %request.user_id,
            %error,
            "Cancel not applied"
        );
    }

    MutationResponse::from_result(result).map(Json)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rsvp_runtime::RsvpStatus;

    #[test]
    fn success_inlines_outcome() {
        let outcome = RsvpOutcome {
            event_id: EventId::new(),
            user_id: UserId::new(),
            status: RsvpStatus::Joined,
            attendee_count: 1,
            available_spots: Some(1),
        };

        let response = MutationResponse::from_result(Ok(outcome)).unwrap();
        let body = serde_json::to_value(&response).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Successfully RSVP'd to event");
        assert_eq!(body["errors"], serde_json::json!([]));
        assert_eq!(body["status"], "JOINED");
        assert_eq!(body["attendeeCount"], 1);
        assert_eq!(body["availableSpots"], 1);
    }

    #[test]
    fn full_event_is_a_refusal_not_an_error() {
        let event_id = EventId::new();
        let response = MutationResponse::from_result(Err(RsvpError::EventFull {
            event_id,
            capacity: 2,
        }))
        .unwrap();

        assert!(!response.success);
        assert_eq!(response.message, "Event is full");
        assert_eq!(response.errors.len(), 1);

        let body = serde_json::to_value(&response).unwrap();
        assert!(body.get("status").is_none());
    }

    #[test]
    fn contention_is_a_refusal() {
        let response =
            MutationResponse::from_result(Err(RsvpError::Contention("lock timeout".into())))
                .unwrap();
        assert!(!response.success);
    }

    #[test]
    fn unknown_ids_are_request_errors() {
        let err = MutationResponse::from_result(Err(RsvpError::event_not_found(EventId::new())))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
