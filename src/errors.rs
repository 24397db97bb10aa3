// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

/// Which identifier pattern a value failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Step,
    Object,
    Blob,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdKind::Step => write!(f, "step_id"),
            IdKind::Object => write!(f, "obj_id"),
            IdKind::Blob => write!(f, "blob_id"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ManualError {
    #[error("Validation error in {entity}: {message}")]
    Validation { entity: String, message: String },

    #[error("Invalid {kind}: {id:?}")]
    InvalidIdentifier { kind: IdKind, id: String },

    #[error("{kind} already present in {container}: {id}")]
    DuplicateId {
        kind: &'static str,
        container: &'static str,
        id: String,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Step '{0}' has no duration; greedy scheduling needs timing for every step")]
    MissingTiming(String),

    #[error("Schedule time overflows at step '{0}'")]
    TimeOverflow(String),

    #[error("Cycle detected in step dependencies involving step '{0}'")]
    CyclicDependency(String),

    #[error("Cyclic schema reference: {0}")]
    CyclicSchemaRef(String),

    #[error("Unresolvable schema reference: {0}")]
    UnresolvedSchemaRef(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ManualError {
    pub(crate) fn validation(entity: impl Into<String>, message: impl Into<String>) -> Self {
        ManualError::Validation {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ManualError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ManualError>;
