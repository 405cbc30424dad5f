//! HTTP API surface for the RSVP service.
//!
//! A thin Axum adapter: handlers parse requests, call the domain service
//! (writes) or the query resolver (reads) and map results to responses.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives; the correlation ID layer tags it
//! 2. **Extract** path, query and JSON (malformed input → 400)
//! 3. **Call** `RsvpService` or `QueryResolver`
//! 4. **Map** the result: payload, [`AppError`], or a `success: false`
//!    mutation response for business refusals
//!
//! # Example
//!
//! ```no_run
//! use rsvp_runtime::{InMemoryEntityStore, ServiceConfig};
//! use rsvp_core::SystemClock;
//! use rsvp_web::{AppState, build_router};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let state = AppState::new(
//!     Arc::new(InMemoryEntityStore::new()),
//!     Arc::new(SystemClock),
//!     ServiceConfig::default(),
//! );
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
// Axum handlers return `Result<_, AppError>` and are documented per route
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError, StoreBackend};
pub use error::AppError;
pub use middleware::{CORRELATION_ID_HEADER, CorrelationId, correlation_id_layer};
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
