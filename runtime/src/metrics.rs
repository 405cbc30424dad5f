//! Business metrics for the RSVP service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `rsvp_joins_total{outcome}` - Join attempts by outcome
//! - `rsvp_cancellations_total{outcome}` - Cancel attempts by outcome
//! - `rsvp_contention_retries_total` - Retried check-and-insert units
//! - `rsvp_events_created_total` - Events created
//! - `rsvp_users_created_total` - Users created

use crate::service::{RsvpOutcome, RsvpStatus};
use metrics::{counter, describe_counter};
use rsvp_core::{Result, RsvpError};

/// Register metric descriptions. Call once at startup, before recording.
pub fn register_metrics() {
    describe_counter!(
        "rsvp_joins_total",
        "Join attempts by outcome (joined, already_attending, full, closed, not_found, contention, error)"
    );
    describe_counter!(
        "rsvp_cancellations_total",
        "Cancel attempts by outcome (cancelled, not_attending, not_found, contention, error)"
    );
    describe_counter!(
        "rsvp_contention_retries_total",
        "Attendance writes retried after transient storage contention"
    );
    describe_counter!("rsvp_events_created_total", "Total number of events created");
    describe_counter!("rsvp_users_created_total", "Total number of users created");

    tracing::info!("RSVP metrics registered");
}

fn outcome_label(result: &Result<RsvpOutcome>) -> &'static str {
    match result {
        Ok(outcome) => match outcome.status {
            RsvpStatus::Joined => "joined",
            RsvpStatus::AlreadyAttending => "already_attending",
            RsvpStatus::Cancelled => "cancelled",
            RsvpStatus::NotAttending => "not_attending",
        },
        Err(RsvpError::EventFull { .. }) => "full",
        Err(RsvpError::EventClosed { .. }) => "closed",
        Err(RsvpError::NotFound { .. }) => "not_found",
        Err(RsvpError::Contention(_)) => "contention",
        Err(_) => "error",
    }
}

pub(crate) fn record_join(result: &Result<RsvpOutcome>) {
    counter!("rsvp_joins_total", "outcome" => outcome_label(result)).increment(1);
}

pub(crate) fn record_cancel(result: &Result<RsvpOutcome>) {
    counter!("rsvp_cancellations_total", "outcome" => outcome_label(result)).increment(1);
}

pub(crate) fn record_event_created() {
    counter!("rsvp_events_created_total").increment(1);
}

pub(crate) fn record_user_created() {
    counter!("rsvp_users_created_total").increment(1);
}
