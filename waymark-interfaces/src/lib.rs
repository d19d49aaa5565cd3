//! # Waymark Interfaces
//!
//! Core interfaces and traits shared across the waymark workspace.
//!
//! The adapter registry, the execution core and the concrete store drivers
//! all depend on these contracts, and none of them depend on each other
//! through this crate.
//!
//! ## Main Interfaces
//!
//! - [`Adapter`] - one connected session to a target data store
//! - [`AdapterFactory`] - creates adapters for a single store type
//! - [`StoreHandle`] - the opaque connection handed to migration units
//! - [`UnitOperations`] - the forward/reverse pair of a migration unit
//! - [`Settings`] - the opaque, read-only configuration value

pub mod adapter;
pub mod settings;
pub mod unit;

// Re-export commonly used types
pub use adapter::{Adapter, AdapterError, AdapterFactory, AdapterResult, StoreHandle};
pub use settings::Settings;
pub use unit::{UnitError, UnitOperations, UnitResult};
