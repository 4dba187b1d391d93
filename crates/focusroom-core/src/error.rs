//! Core error types for focusroom-core.
//!
//! This module defines the error hierarchy using thiserror. Audio errors
//! stop at the playback engine's boundary; everything else may surface
//! to the caller through [`CoreError`].

use std::path::PathBuf;
use thiserror::Error;

use crate::playback::HandleId;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Session report submission errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors. Messages are shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Planned duration outside the accepted range
    #[error("Focus duration must be between {min} and {max} minutes (got {minutes})")]
    DurationOutOfRange { minutes: u32, min: u32, max: u32 },

    /// Command not accepted in the current session status
    #[error("Cannot {action} while the session is {status}")]
    InvalidState { action: &'static str, status: String },

    /// Sound category name not recognized
    #[error("Unknown sound category: {0}")]
    UnknownCategory(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failure of the external "submit session result" call.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// The collaborator rejected or could not accept the summary
    #[error("Session result submission failed: {0}")]
    SubmitFailed(String),

    /// Local storage failed underneath the reporter
    #[error("Session result storage failed: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Audio resource errors. Logged and absorbed by the playback engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Asset missing, unreadable or not decodable
    #[error("Failed to load '{locator}': {message}")]
    LoadFailed { locator: String, message: String },

    /// The handle was released or never existed
    #[error("Sound handle {0} is no longer valid")]
    InvalidHandle(HandleId),

    /// Audio output is not available on this device
    #[error("Audio playback not supported: {0}")]
    Unsupported(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::InvalidValue {
            key: "<file>".into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
