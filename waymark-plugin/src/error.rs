//! Adapter registry error types

use thiserror::Error;
use waymark_interfaces::AdapterError;

/// Adapter registry result type
pub type PluginResult<T> = Result<T, PluginError>;

/// Adapter registry errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// No factory registered for the store type
    #[error("No adapter registered for store type '{store_type}' (known: {known})")]
    AdapterNotFound { store_type: String, known: String },

    /// A factory for the store type is already registered
    #[error("Adapter for store type '{store_type}' already registered")]
    AdapterAlreadyRegistered { store_type: String },

    /// The migrations folder has no usable final segment
    #[error("Cannot derive a store type from folder '{path}'")]
    InvalidStoreFolder { path: String },

    /// The factory was found but could not produce a ready session
    #[error("Adapter '{store_type}' failed to connect: {source}")]
    ConnectFailed {
        store_type: String,
        #[source]
        source: AdapterError,
    },
}

impl PluginError {
    /// Store type the error refers to, when there is one
    pub fn store_type(&self) -> Option<&str> {
        match self {
            Self::AdapterNotFound { store_type, .. }
            | Self::AdapterAlreadyRegistered { store_type }
            | Self::ConnectFailed { store_type, .. } => Some(store_type),
            Self::InvalidStoreFolder { .. } => None,
        }
    }
}
