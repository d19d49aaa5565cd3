//! Migration runner configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Migration runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory holding one migrations folder per store type
    pub migrations_root: PathBuf,

    /// Bypass the apply-state check unless the command line says otherwise
    #[serde(default = "crate::domains::utils::default_false")]
    pub default_force: bool,

    /// File stem of the store settings files (`<stem>.yaml`, `<stem>.secrets.yaml`)
    pub settings_file_stem: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            migrations_root: PathBuf::from("migrations"),
            default_force: false,
            settings_file_stem: "waymark".to_string(),
        }
    }
}

impl Validatable for RunnerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(
            &self.settings_file_stem,
            "settings_file_stem",
            self.domain_name(),
        )?;

        if self.settings_file_stem.contains(std::path::is_separator) {
            return Err(self.validation_error("settings_file_stem must be a bare file stem"));
        }

        if self.migrations_root.as_os_str().is_empty() {
            return Err(self.validation_error("migrations_root cannot be empty"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "runner"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.migrations_root, PathBuf::from("migrations"));
        assert!(!config.default_force);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_runner_validation() {
        let config = RunnerConfig {
            settings_file_stem: "conf/waymark".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunnerConfig {
            migrations_root: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
