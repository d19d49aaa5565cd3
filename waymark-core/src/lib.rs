//! Migration execution core for waymark
//!
//! Discovers ordered migration units in a directory, checks each requested
//! transition against the state recorded by the store adapter, runs the
//! unit's forward or reverse operation and finalizes the adapter session.
//!
//! The pieces, leaves first:
//!
//! - [`discovery`] lists unit files in execution order
//! - [`guard`] checks a transition against recorded state
//! - [`unit`] turns a unit path into forward/reverse operations
//! - [`executor`] runs one unit and records its new state
//! - [`orchestrator`] drives whole sessions through [`Migrator`]
//! - [`scaffold`] creates new, correctly named unit files

pub mod discovery;
pub mod error;
pub mod executor;
pub mod guard;
pub mod orchestrator;
pub mod scaffold;
pub mod unit;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use discovery::{discover, unit_name};
pub use error::{ConflictReason, FinalizeStage, MigrateError, MigrateResult};
pub use executor::Direction;
pub use orchestrator::{Migrator, RunReport, UnitStatus};
pub use scaffold::create_unit;
pub use unit::{ScriptLoader, ScriptUnit, StaticUnitLoader, UnitLoader};
