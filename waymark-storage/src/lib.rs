//! Store adapters for waymark
//!
//! - [`sqlite`]: transactional adapter over sqlx; the migrations and the
//!   tracking table commit or roll back together.
//! - [`shell`]: runs scripts through a shell and keeps state in a JSON
//!   ledger file. Commands cannot be undone, so rollback only discards
//!   unsaved ledger changes.

#[cfg(feature = "shell")]
pub mod shell;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use waymark_plugin::{AdapterRegistry, PluginResult};

/// Register every adapter compiled into this crate
pub fn register_builtin(registry: &mut AdapterRegistry) -> PluginResult<()> {
    #[cfg(feature = "sqlite")]
    registry.register(sqlite::SqliteFactory)?;
    #[cfg(feature = "shell")]
    registry.register(shell::ShellFactory)?;
    Ok(())
}

/// Select the adapter's own section of shared settings, falling back to the
/// top level when the section is absent
#[cfg(any(feature = "sqlite", feature = "shell"))]
pub(crate) fn store_section(
    settings: &waymark_interfaces::Settings,
    store_type: &str,
) -> waymark_interfaces::Settings {
    settings
        .section(store_type)
        .unwrap_or_else(|| settings.clone())
}
