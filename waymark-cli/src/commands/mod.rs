//! CLI command implementations

pub mod apply;
pub mod config;
pub mod create;
pub mod revert;
pub mod status;
pub mod stores;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use waymark_config::{SettingsDiscovery, WaymarkConfig};
use waymark_core::Migrator;
use waymark_interfaces::Settings;
use waymark_plugin::AdapterRegistry;

/// Everything a command needs, built once in `main`
pub struct AppContext {
    pub config: WaymarkConfig,
    pub migrator: Migrator,
}

impl AppContext {
    pub fn new(config: WaymarkConfig) -> Result<Self> {
        let mut registry =
            AdapterRegistry::with_static_adapters().context("Failed to collect linked adapters")?;
        waymark_storage::register_builtin(&mut registry)
            .context("Failed to register built-in adapters")?;

        Ok(Self {
            config,
            migrator: Migrator::new(Arc::new(registry)),
        })
    }

    /// Store settings that apply to `folder`
    pub fn settings_for(&self, folder: &Path) -> Result<Settings> {
        let discovered = SettingsDiscovery::from_config(&self.config.runner)
            .discover(folder)
            .with_context(|| format!("Failed to load store settings for {}", folder.display()))?;
        Ok(discovered.settings)
    }

    pub fn force(&self, flag: bool) -> bool {
        flag || self.config.runner.default_force
    }
}

/// Folder a unit file lives in, `.` for a bare file name
pub(crate) fn unit_folder(unit: &Path) -> &Path {
    match unit.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
