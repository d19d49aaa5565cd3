//! Migration unit operations

use async_trait::async_trait;

use crate::adapter::{AdapterError, StoreHandle};
use crate::settings::Settings;

/// Result of running one direction of a migration unit
pub type UnitResult = Result<(), UnitError>;

/// Errors raised by a unit's forward or reverse operation
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    Store(#[from] AdapterError),

    #[error("Script references missing or non-scalar setting '{0}'")]
    MissingSetting(String),

    #[error("{0}")]
    Failed(String),
}

impl UnitError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// The forward/reverse pair exposed by every migration unit
#[async_trait]
pub trait UnitOperations: Send + Sync {
    /// Perform the change implied by the unit's name
    async fn forward(&self, handle: &mut dyn StoreHandle, settings: &Settings) -> UnitResult;

    /// Undo the change made by [`UnitOperations::forward`]
    async fn reverse(&self, handle: &mut dyn StoreHandle, settings: &Settings) -> UnitResult;
}
