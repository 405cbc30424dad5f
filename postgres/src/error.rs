//! Translation of sqlx failures into the domain error taxonomy.

use rsvp_core::RsvpError;

/// SQLSTATE codes that mean "try again": serialization failure, deadlock,
/// lock not available (raised when `lock_timeout` expires).
const RETRYABLE_STATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// Map a sqlx error to [`RsvpError::Contention`] or [`RsvpError::Storage`].
pub(crate) fn storage(context: &str, err: sqlx::Error) -> RsvpError {
    if is_retryable(&err) {
        tracing::warn!(error = %err, context, "Contended database operation");
        metrics::counter!("rsvp_store_contention_total").increment(1);
        return RsvpError::Contention(format!("{context}: {err}"));
    }

    tracing::error!(error = %err, context, "Database operation failed");
    RsvpError::Storage(format!("{context}: {err}"))
}

fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| RETRYABLE_STATES.iter().any(|state| *state == code)),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// The violated constraint name, when `err` is a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default())
        }
        _ => None,
    }
}

/// The violated constraint name, when `err` is a foreign-key violation.
pub(crate) fn foreign_key_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            Some(db_err.constraint().unwrap_or_default())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeouts_are_contention() {
        let err = storage("acquire", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RsvpError::Contention(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn other_failures_are_storage() {
        let err = storage("query", sqlx::Error::RowNotFound);
        assert!(matches!(err, RsvpError::Storage(ref msg) if msg.starts_with("query: ")));
        assert!(unique_violation(&sqlx::Error::RowNotFound).is_none());
        assert!(foreign_key_violation(&sqlx::Error::PoolClosed).is_none());
    }
}
