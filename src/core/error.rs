//! Error types and error handling for the codeindex service.
//!
//! This module defines the error type used throughout the crate
//! and its mapping onto the caller-facing [`ErrorCode`] carried by
//! build and search responses.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for codeindex operations
pub type Result<T> = std::result::Result<T, IndexError>;

/// Structured error code reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    WorkspaceNotFound,
    DatabaseError,
    Cancelled,
    IndexBuilding,
    InvalidOptions,
    IndexNotFound,
    QueryEmpty,
    QueryTooLong,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::IndexBuilding => "INDEX_BUILDING",
            ErrorCode::InvalidOptions => "INVALID_OPTIONS",
            ErrorCode::IndexNotFound => "INDEX_NOT_FOUND",
            ErrorCode::QueryEmpty => "QUERY_EMPTY",
            ErrorCode::QueryTooLong => "QUERY_TOO_LONG",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the codeindex service
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("An index build is already in progress")]
    BuildInProgress,

    #[error("Index build was cancelled")]
    Cancelled,

    #[error("Index not built: {0}")]
    IndexNotFound(String),

    #[error("Index is being rebuilt, try again when the build completes")]
    IndexBuilding,

    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("Query is too long ({length} chars, maximum {max})")]
    QueryTooLong { length: usize, max: usize },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl IndexError {
    /// Get user-friendly error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Map the error onto the code reported to callers
    ///
    /// I/O and serialization failures only reach callers from
    /// engine-level operations (persist, restore, clear), so they
    /// share the database class.
    pub fn code(&self) -> ErrorCode {
        match self {
            IndexError::WorkspaceNotFound(_) => ErrorCode::WorkspaceNotFound,
            IndexError::BuildInProgress | IndexError::IndexBuilding => ErrorCode::IndexBuilding,
            IndexError::Cancelled => ErrorCode::Cancelled,
            IndexError::IndexNotFound(_) => ErrorCode::IndexNotFound,
            IndexError::EmptyQuery => ErrorCode::QueryEmpty,
            IndexError::QueryTooLong { .. } => ErrorCode::QueryTooLong,
            IndexError::ConfigError(_) | IndexError::TomlError(_) => ErrorCode::InvalidOptions,
            IndexError::Engine(_) | IndexError::IoError(_) | IndexError::SerdeError(_) => {
                ErrorCode::DatabaseError
            }
        }
    }

    /// Check if this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IndexError::Cancelled)
    }

    /// Check if this is a bad request error (invalid input)
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            IndexError::EmptyQuery | IndexError::QueryTooLong { .. } | IndexError::ConfigError(_)
        )
    }
}
