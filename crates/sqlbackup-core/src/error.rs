//! Error types for SQLbackup

use std::time::Duration;
use thiserror::Error;

/// Errors raised by drivers and by deadlines around driver calls
#[derive(Error, Debug)]
pub enum SqlBackupError {
    /// Connecting, pinging or closing the session failed
    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// A catalog lookup (table list or DDL) failed
    #[error("catalog query on {object} failed: {message}")]
    Catalog { object: String, message: String },

    #[error("row query failed: {0}")]
    RowQuery(String),

    /// A fetched value could not be read with its projected encoding
    #[error("cannot read column {column}: {message}")]
    Decode { column: usize, message: String },

    #[error("{operation} did not complete within {}s", .limit.as_secs())]
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    /// The session is still held by an earlier call that has not returned
    #[error("connection busy: {operation} could not start within {}s", .waited.as_secs())]
    Busy {
        operation: &'static str,
        waited: Duration,
    },

    /// A blocking driver task panicked or was cancelled
    #[error("{operation} task failed: {message}")]
    Task {
        operation: &'static str,
        message: String,
    },
}

impl SqlBackupError {
    /// Whether the error is a deadline expiring rather than a server answer
    pub fn is_timeout(&self) -> bool {
        matches!(self, SqlBackupError::Timeout { .. })
    }
}

/// Result type alias for SQLbackup operations
pub type Result<T> = std::result::Result<T, SqlBackupError>;
