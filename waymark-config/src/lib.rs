//! Configuration management for waymark
//!
//! Two kinds of configuration live here:
//!
//! - the tool's own configuration ([`WaymarkConfig`]), split by domain and
//!   loaded from YAML with `WAYMARK_*` environment overrides;
//! - the opaque store [`Settings`](waymark_interfaces::Settings) handed to
//!   adapters, discovered next to the migrations being run.

pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use settings::{merge_values, DiscoveredSettings, SettingsDiscovery, SETTINGS_SEARCH_DEPTH};

// Re-export domain configurations
pub use domains::{logging::LoggingConfig, runner::RunnerConfig, WaymarkConfig};
