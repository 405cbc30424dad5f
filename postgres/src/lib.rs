//! `PostgreSQL` entity store for the RSVP service.
//!
//! This crate provides a durable implementation of the `EntityStore` trait from
//! `rsvp-core`. It uses sqlx with runtime-checked queries and supports:
//!
//! - Connection pooling
//! - Schema migrations embedded at build time
//! - Row-locked conditional attendance inserts
//! - Mapping of lock timeouts and serialization failures to retryable
//!   contention errors
//!
//! # Example
//!
//! ```no_run
//! use rsvp_postgres::{PostgresConfig, PostgresEntityStore};
//!
//! # async fn example() -> Result<(), rsvp_core::RsvpError> {
//! let store = PostgresEntityStore::connect(&PostgresConfig::new("postgres://localhost/rsvp")).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod rows;
mod store;

pub use store::{PostgresConfig, PostgresEntityStore};
