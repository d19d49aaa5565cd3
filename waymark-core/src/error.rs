//! Migration error types

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use waymark_interfaces::{AdapterError, UnitError};
use waymark_plugin::PluginError;

use crate::executor::Direction;

/// Result type alias for the execution core
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Why a requested transition disagrees with recorded state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    AlreadyApplied,
    NotApplied,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyApplied => write!(f, "has already been applied"),
            Self::NotApplied => write!(f, "has not been applied yet"),
        }
    }
}

/// Session finalize step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStage {
    Commit,
    Rollback,
    Close,
}

impl fmt::Display for FinalizeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::Rollback => write!(f, "rollback"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// Errors surfaced by the execution core
#[derive(Debug, Error)]
pub enum MigrateError {
    /// No adapter could be produced for the store type
    #[error("Failed to load adapter for store type '{store_type}': {reason}")]
    LoadFailure { store_type: String, reason: String },

    /// Requested transition is inconsistent with recorded state
    #[error("Migration '{name}' {reason}")]
    StateConflict { name: String, reason: ConflictReason },

    /// Recorded state could not be read
    #[error("Failed to read state of migration '{name}': {source}")]
    StateQuery {
        name: String,
        #[source]
        source: AdapterError,
    },

    /// Unit file unreadable or malformed
    #[error("Failed to load migration '{name}': {reason}")]
    UnitLoad { name: String, reason: String },

    /// The unit's operation, or recording its new state, failed
    #[error("Migration '{name}' failed during {direction}: {source}")]
    ExecutionFailure {
        name: String,
        direction: Direction,
        #[source]
        source: UnitError,
    },

    /// Commit, rollback or close failed
    #[error("Adapter {stage} failed: {source}")]
    FinalizeFailure {
        stage: FinalizeStage,
        #[source]
        source: AdapterError,
    },

    /// Migrations directory could not be listed
    #[error("Failed to read migrations directory {}: {source}", .path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A new unit file could not be created
    #[error("Cannot create migration: {0}")]
    Scaffold(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    /// Whether the adapter session may still be committed after this error.
    ///
    /// True for errors raised before the store was touched.
    pub fn leaves_store_untouched(&self) -> bool {
        matches!(self, Self::StateConflict { .. } | Self::UnitLoad { .. })
    }

    /// Name of the migration the error refers to, when there is one
    pub fn unit_name(&self) -> Option<&str> {
        match self {
            Self::StateConflict { name, .. }
            | Self::StateQuery { name, .. }
            | Self::UnitLoad { name, .. }
            | Self::ExecutionFailure { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<PluginError> for MigrateError {
    fn from(err: PluginError) -> Self {
        Self::LoadFailure {
            store_type: err.store_type().unwrap_or("<unknown>").to_string(),
            reason: err.to_string(),
        }
    }
}
