//! Shared failure categories for SunAlert services.
//!
//! HTTP and SQLite errors are folded into two small enums so the history
//! and UV crates can decide what is worth retrying and what to tell the user
//! without depending on transport details.

use thiserror::Error;

/// Failure talking to a remote HTTP service.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Service unreachable: {0}")]
    Offline(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Offline(_) => "You appear to be offline. Your history is kept on this device.",
            Self::Timeout => "The service took too long to answer.",
            Self::Http { status, .. } if *status >= 500 => {
                "The service is having trouble right now."
            }
            Self::Http { .. } => "The service refused the request.",
            Self::Malformed(_) => "The service sent data we could not read.",
        }
    }

    /// Whether a later attempt may succeed without any change on our side.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Offline(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) => false,
        }
    }
}

/// Failure in the local SQLite database.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    #[error("Database file is corrupt: {0}")]
    Corrupt(String),

    #[error("Statement failed: {0}")]
    Statement(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "Local history could not be opened.",
            Self::Corrupt(_) => "Local history is damaged and may need to be cleared.",
            Self::Statement(_) => "Saving or reading local history failed.",
        }
    }
}

/// Conversion of reqwest failures into [`NetworkError`].
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if self.is_decode() || self.is_body() {
            return NetworkError::Malformed(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::Http {
                status: status.as_u16(),
                message: self.to_string(),
            },
            // Connect, redirect and request-building failures all mean we never got an answer
            None => NetworkError::Offline(self.to_string()),
        }
    }
}

/// Conversion of rusqlite failures into [`DatabaseError`].
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        use rusqlite::ErrorCode;

        let code = self.sqlite_error_code();
        let message = self.to_string();
        match code {
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                DatabaseError::Corrupt(message)
            }
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure,
            ) => DatabaseError::Unavailable(message),
            _ => DatabaseError::Statement(message),
        }
    }
}
