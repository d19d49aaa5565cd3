//! Store settings discovery
//!
//! Settings live beside the migrations they configure. Starting at the
//! migrations folder and walking at most [`SETTINGS_SEARCH_DEPTH`] ancestor
//! levels, the nearest `<stem>.yaml` is the base document and the nearest
//! `<stem>.secrets.yaml` is deep-merged over it. `.yml` and `.json` work too.

use serde_json::Value;
use std::path::{Path, PathBuf};
use waymark_interfaces::Settings;

use crate::domains::runner::RunnerConfig;
use crate::error::{ConfigError, ConfigResult};

/// Number of ancestor directories searched above the migrations folder
pub const SETTINGS_SEARCH_DEPTH: usize = 2;

const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Merged settings and the files they came from
#[derive(Debug, Clone)]
pub struct DiscoveredSettings {
    pub settings: Settings,
    pub base: Option<PathBuf>,
    pub secrets: Option<PathBuf>,
}

/// Locates and merges store settings files
#[derive(Debug, Clone)]
pub struct SettingsDiscovery {
    stem: String,
}

impl SettingsDiscovery {
    pub fn new(stem: impl Into<String>) -> Self {
        Self { stem: stem.into() }
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.settings_file_stem.clone())
    }

    /// Directories searched for `folder`, nearest first
    pub fn search_dirs(&self, folder: &Path) -> Vec<PathBuf> {
        folder
            .ancestors()
            .take(SETTINGS_SEARCH_DEPTH + 1)
            .map(|dir| {
                if dir.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    dir.to_path_buf()
                }
            })
            .collect()
    }

    /// Discover and merge the settings that apply to `folder`
    pub fn discover(&self, folder: &Path) -> ConfigResult<DiscoveredSettings> {
        let base = self.find_nearest(folder, &self.stem);
        let secrets = self.find_nearest(folder, &format!("{}.secrets", self.stem));

        let mut document = match &base {
            Some(path) => read_document(path)?,
            None => Value::Object(Default::default()),
        };

        if let Some(path) = &secrets {
            merge_values(&mut document, read_document(path)?);
        }

        tracing::debug!(
            folder = %folder.display(),
            base = ?base,
            secrets = ?secrets,
            "Store settings discovered"
        );

        let settings = Settings::from_value(document).ok_or_else(|| ConfigError::SettingsShape {
            path: base
                .as_ref()
                .or(secrets.as_ref())
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        })?;

        Ok(DiscoveredSettings {
            settings,
            base,
            secrets,
        })
    }

    fn find_nearest(&self, folder: &Path, file_stem: &str) -> Option<PathBuf> {
        self.search_dirs(folder).into_iter().find_map(|dir| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(format!("{}.{}", file_stem, ext)))
                .find(|candidate| candidate.is_file())
        })
    }
}

impl Default for SettingsDiscovery {
    fn default() -> Self {
        Self::new("waymark")
    }
}

/// Read a YAML or JSON settings document; empty files are empty mappings
fn read_document(path: &Path) -> ConfigResult<Value> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };

    if !value.is_object() {
        return Err(ConfigError::SettingsShape {
            path: path.display().to_string(),
        });
    }

    Ok(value)
}

/// Deep-merge `overlay` into `base`: objects merge key by key, anything else replaces
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
