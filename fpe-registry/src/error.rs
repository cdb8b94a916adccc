//! Error types for the registry and its context handles.

use std::fmt;

use fpe_engine::{Direction, EngineError};

/// Setup stage at which context creation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    /// Arguments rejected before any engine call
    Validate,
    /// Library context creation
    Library,
    /// Protect transform creation
    ProtectTransform,
    /// Access transform creation
    AccessTransform,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            InitStage::Validate => "validate",
            InitStage::Library => "library context",
            InitStage::ProtectTransform => "protect transform",
            InitStage::AccessTransform => "access transform",
        };
        f.write_str(stage)
    }
}

/// Error types for FPE registry operations.
#[derive(Debug, thiserror::Error)]
pub enum FpeError {
    /// Context handle could not be constructed
    #[error("Initialization failed at {stage}: {source}")]
    Initialization {
        stage: InitStage,
        #[source]
        source: EngineError,
    },

    /// Protect or access call failed
    #[error("{direction} failed: {source}")]
    Transform {
        direction: Direction,
        #[source]
        source: EngineError,
    },

    /// No profile registered under this id
    #[error("FPE with id '{0}' not found")]
    NotFound(String),

    /// Registry configuration is invalid
    #[error("Config error: {0}")]
    Config(String),

    /// Caller-side wait expired before the engine returned
    #[error("Operation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Background task failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FpeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        FpeError::Initialization {
            stage: InitStage::Validate,
            source: EngineError::InvalidArgument(reason.into()),
        }
    }

    /// Whether this error means the id was not registered.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FpeError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, FpeError>;
