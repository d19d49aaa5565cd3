//! Store adapter interfaces
//!
//! An adapter is one connected session against a concrete data store. It
//! exposes an opaque handle for migration units plus the small set of state
//! and session calls the execution core needs.

use async_trait::async_trait;
use std::any::Any;

use crate::settings::Settings;

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors raised by store adapters
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("State tracking failed for '{name}': {reason}")]
    State { name: String, reason: String },

    #[error("Script execution failed: {0}")]
    Execution(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Session has already been finalized")]
    SessionFinalized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Opaque connection object handed to migration units.
///
/// Script units only need [`StoreHandle::execute`]; units written in Rust can
/// downcast through [`StoreHandle::as_any_mut`] to reach the concrete
/// connection type of the adapter they target.
#[async_trait]
pub trait StoreHandle: Send {
    /// Execute a script in the store's native language
    async fn execute(&mut self, script: &str) -> AdapterResult<()>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// One session against a target data store.
///
/// Exactly one of [`Adapter::commit`] or [`Adapter::rollback`] is called
/// before [`Adapter::close`], which consumes the adapter.
#[async_trait]
pub trait Adapter: Send {
    /// Store type this adapter was created for
    fn store_type(&self) -> &str;

    /// Handle passed verbatim to unit operations
    fn handle(&mut self) -> &mut dyn StoreHandle;

    /// Whether `name` is currently recorded as applied
    async fn applied_state(&mut self, name: &str) -> AdapterResult<bool>;

    /// Mark `name` as applied
    async fn record(&mut self, name: &str) -> AdapterResult<()>;

    /// Mark `name` as not applied
    async fn remove(&mut self, name: &str) -> AdapterResult<()>;

    /// Persist this session's changes where practical
    async fn commit(&mut self) -> AdapterResult<()>;

    /// Discard this session's uncommitted changes where practical.
    ///
    /// Adapters for non-transactional stores may implement this as a no-op.
    async fn rollback(&mut self) -> AdapterResult<()>;

    /// Release the underlying connection
    async fn close(self: Box<Self>) -> AdapterResult<()>;
}

/// Creates connected adapters for one store type
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Registry key, matched against the final segment of a migrations folder
    fn store_type(&self) -> &str;

    /// Short human readable description
    fn description(&self) -> &str {
        ""
    }

    /// Connect and return a ready session
    async fn connect(&self, settings: &Settings) -> AdapterResult<Box<dyn Adapter>>;
}
