//! Error types for scoutqueue.
//!
//! This module defines the error types used throughout the scoutqueue crate.
//! Queue-level operations never surface these to callers (they degrade to a
//! [`SubmitOutcome`](crate::manager::SubmitOutcome)); they show up at the
//! storage, configuration, roster and validation seams.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for scoutqueue operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The key-value store refused a read or write.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A form entry is missing a required field.
    #[error("missing required field '{field}': {hint}")]
    MissingField {
        /// Record field name.
        field: &'static str,
        /// What the scout should do about it.
        hint: &'static str,
    },

    /// The shared submit code did not match.
    #[error("submit code rejected")]
    AccessDenied,

    // === Roster Errors ===
    /// Team roster lookup failed.
    #[error("roster lookup failed: {0}")]
    Roster(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for scoutqueue operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new roster lookup error.
    #[must_use]
    pub fn roster(message: impl Into<String>) -> Self {
        Self::Roster(message.into())
    }

    /// Create a new store-unavailable error.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Create a missing-field validation error.
    #[must_use]
    pub fn missing_field(field: &'static str, hint: &'static str) -> Self {
        Self::MissingField { field, hint }
    }

    /// Check if this error is a form validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::MissingField { .. })
    }

    /// Check if this error came from the persisted store.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::StoreUnavailable(_)
        )
    }
}
