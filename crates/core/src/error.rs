//! Error types for layerconf.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Collaborator failures (sources, serializers, validators) have their own
//! types and convert into the top-level [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all layerconf operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: no sources were supplied")]
    NoSources,

    #[error("Configuration error: more than one primary source (indices {indices:?})")]
    MultiplePrimarySources { indices: Vec<usize> },

    #[error("Configuration error: required source '{source_name}' has no configuration")]
    RequiredSourceMissing { source_name: String },

    // --- Validation errors ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Usage errors ---
    #[error("Unknown source index {index} (manager has {count} sources)")]
    UnknownSource { index: usize, count: usize },

    #[error("Source '{source_name}' is read-only and cannot be saved to")]
    ReadOnlySource { source_name: String },

    #[error("Unknown field: {field}")]
    UnknownField { field: String },

    #[error("Change tracking cannot be disabled once enabled")]
    ChangeTrackingLocked,

    // --- Collaborator errors ---
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source stack itself is invalid (construction time).
    Configuration,
    /// A validator rejected a loaded object.
    Validation,
    /// The caller asked for something the manager cannot do.
    Usage,
    /// A source or serializer failed.
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoSources
            | Error::MultiplePrimarySources { .. }
            | Error::RequiredSourceMissing { .. } => ErrorKind::Configuration,
            Error::Validation(_) => ErrorKind::Validation,
            Error::UnknownSource { .. }
            | Error::ReadOnlySource { .. }
            | Error::UnknownField { .. }
            | Error::ChangeTrackingLocked => ErrorKind::Usage,
            Error::Source(_) | Error::Serialization(_) => ErrorKind::Io,
        }
    }
}

// --- Collaborator errors ---

/// Failures raised by sources and serializers.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Failed to parse {format} document: {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("Failed to serialize {format} document: {reason}")]
    Serialize { format: &'static str, reason: String },

    #[error("I/O error on {format} stream: {reason}")]
    Stream { format: &'static str, reason: String },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field {field} has no `{key}` key in the serialized document")]
    MissingKey { field: String, key: String },
}

/// A validator rejected a configuration object.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the rule that failed, when the validator is rule-based.
    pub rule: Option<String>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            rule: None,
            message: message.into(),
        }
    }

    pub fn for_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: Some(rule.into()),
            message: message.into(),
        }
    }
}
