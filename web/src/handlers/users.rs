//! User endpoints.
//!
//! - GET /api/users - All users
//! - GET /api/users/:id - User with organized and attending events
//! - POST /api/users - Register a user

use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use rsvp_core::{NewUser, User, UserId};
use rsvp_runtime::UserDetails;
use serde::Deserialize;
use uuid::Uuid;

/// Request to register a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Display name
    pub name: String,
    /// Email address (unique, case-insensitive)
    pub email: String,
}

/// List all users, oldest first.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.queries.users().await?))
}

/// Get a user with `organizedEvents` and `attendingEvents`.
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<UserDetails>, AppError> {
    Ok(Json(state.queries.user_details(UserId::from_uuid(id)).await?))
}

/// Register a user.
///
/// ```bash
/// curl -X POST http://localhost:8080/api/users \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ada Lovelace", "email": "ada@example.com"}'
/// ```
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .service
        .create_user(NewUser {
            name: request.name,
            email: request.email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}
