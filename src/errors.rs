use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::io::ErrorKind;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Failed to acquire a pooled connection (pool exhausted or network-level
    /// failure). Retryable.
    Connection(sqlx::Error),
    /// Statement failed on a connection-level fault (lost, reset, timeout,
    /// refused). Retryable.
    TransientQuery(sqlx::Error),
    /// Statement failed for a non-transient reason (constraint violation,
    /// syntax, permission). Never retried.
    FatalQuery(sqlx::Error),
    /// Caller violated an allow-list or omitted a required identifier.
    /// Never retried; indicates a caller bug.
    Validation(String),
    /// Requested record does not exist.
    NotFound(String),
}

impl AppError {
    /// Classifies a failure that occurred while acquiring a connection from
    /// the pool. Acquisition failures are always eligible for retry.
    pub fn from_acquire(err: sqlx::Error) -> Self {
        AppError::Connection(err)
    }

    /// Classifies a failure that occurred while running a statement on an
    /// already-acquired connection.
    pub fn from_statement(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            AppError::TransientQuery(err)
        } else {
            AppError::FatalQuery(err)
        }
    }

    /// Whether the query executor may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Connection(_) | AppError::TransientQuery(_))
    }
}

/// Connection-level faults that warrant a retry: network errors surfaced as
/// IO failures, pool acquisition timeouts, and MySQL connection exceptions
/// (SQLSTATE class 08, e.g. 08S01 "communication link failure").
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::ConnectionRefused
                | ErrorKind::NotConnected
                | ErrorKind::BrokenPipe
                | ErrorKind::TimedOut
                | ErrorKind::HostUnreachable
        ),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| code.starts_with("08"))
            .unwrap_or(false),
        _ => false,
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Connection(e) => write!(f, "Connection error: {}", e),
            AppError::TransientQuery(e) => write!(f, "Transient query error: {}", e),
            AppError::FatalQuery(e) => write!(f, "Query error: {}", e),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Validation and not-found conditions map to 4xx; every other failure
    /// maps to 500 with a generic message. Internal detail is logged, never
    /// leaked to the client.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Connection(e) | AppError::TransientQuery(e) | AppError::FatalQuery(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a raw `sqlx::Error` into an `AppError`, classifying it as a
    /// statement-side failure.
    fn from(err: sqlx::Error) -> Self {
        AppError::from_statement(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_connection_faults_are_retryable() {
        for kind in [
            ErrorKind::ConnectionReset,
            ErrorKind::ConnectionAborted,
            ErrorKind::ConnectionRefused,
            ErrorKind::TimedOut,
            ErrorKind::BrokenPipe,
            ErrorKind::HostUnreachable,
        ] {
            let err = AppError::from_statement(sqlx::Error::Io(io::Error::new(kind, "boom")));
            assert!(err.is_retryable(), "{:?} should be retryable", kind);
        }
    }

    #[test]
    fn pool_timeouts_are_retryable() {
        assert!(AppError::from_statement(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(AppError::from_statement(sqlx::Error::PoolClosed).is_retryable());
    }

    #[test]
    fn other_statement_errors_are_fatal() {
        let err = AppError::from_statement(sqlx::Error::ColumnNotFound("nope".into()));
        assert!(matches!(err, AppError::FatalQuery(_)));
        assert!(!err.is_retryable());

        let err = AppError::from_statement(sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());
    }

    #[test]
    fn acquire_failures_are_always_retryable() {
        let err = AppError::from_acquire(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Connection(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_and_not_found_are_never_retryable() {
        assert!(!AppError::Validation("bad field".into()).is_retryable());
        assert!(!AppError::NotFound("no lead".into()).is_retryable());
    }
}
