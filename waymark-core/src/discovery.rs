//! Migration unit discovery
//!
//! A directory holds units for a single store. Unit files carry a sortable
//! timestamp prefix, so lexical order of the file names is execution order.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, MigrateResult};

/// Extension of migration unit files
pub const UNIT_EXTENSION: &str = "sql";

static UNIT_FILE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d+.*\.sql$").expect("unit file name pattern")
});

/// Whether a file name follows the unit naming convention
pub fn is_unit_file_name(file_name: &str) -> bool {
    UNIT_FILE_NAME.is_match(file_name)
}

/// List the migration units of `dir` in execution order.
///
/// Subdirectories are skipped, never descended into.
pub fn discover(dir: &Path) -> MigrateResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| MigrateError::Discovery {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| MigrateError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        if !is_unit_file_name(file_name) {
            continue;
        }

        if entry.path().is_dir() {
            continue;
        }

        units.push(entry.path());
    }

    units.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    tracing::debug!(dir = %dir.display(), count = units.len(), "Discovered migrations");

    Ok(units)
}

/// Unit name: the file name with its extension stripped
pub fn unit_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
