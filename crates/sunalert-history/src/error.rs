//! Error types for the history workflow.
//!
//! Local-storage faults (`StoreError`) are surfaced to callers. Remote faults
//! (`MirrorError`) never cross the coordinator boundary; they are logged and
//! the record stays unsynced until the next pending sync.

use sunalert_core::{DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt};
use thiserror::Error;

/// Errors from the local record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.into_database_error())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the remote mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Mirror rejected request: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to read photo {path}: {source}")]
    Photo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Mirror client setup failed: {0}")]
    Client(String),
}

impl From<reqwest::Error> for MirrorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.into_network_error())
    }
}

impl MirrorError {
    /// Whether the next sync attempt may succeed without user action.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_transient(),
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Photo { .. } | Self::Client(_) => false,
        }
    }
}

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors surfaced by coordinator operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Local storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl HistoryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Storage(StoreError::Database(e)) => e.user_message(),
            Self::Storage(StoreError::Io(_)) => "Unable to access local history storage.",
            Self::Task(_) => "A history operation was interrupted. Please try again.",
        }
    }
}

/// Result type for coordinator operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
