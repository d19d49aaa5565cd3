//! New migration unit files

use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::discovery::{is_unit_file_name, UNIT_EXTENSION};
use crate::error::{MigrateError, MigrateResult};

/// Timestamp prefix of unit file names, millisecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%3f";

const TEMPLATE: &str = "\
-- forward


-- reverse

";

/// Lowercase `slug`, collapsing every run of other characters into one `-`
pub fn slugify(slug: &str) -> String {
    let mut out = String::with_capacity(slug.len());
    let mut pending_dash = false;

    for ch in slug.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    out
}

/// File name for a unit created at `now`
pub fn unit_file_name(slug: &str, now: DateTime<Utc>) -> MigrateResult<String> {
    let slug = slugify(slug);
    if slug.is_empty() {
        return Err(MigrateError::Scaffold(
            "slug must contain at least one letter or digit".to_string(),
        ));
    }

    Ok(format!(
        "{}-{}.{}",
        now.format(TIMESTAMP_FORMAT),
        slug,
        UNIT_EXTENSION
    ))
}

/// Create a new unit file in `dir` stamped with the current time
pub fn create_unit(dir: &Path, slug: &str) -> MigrateResult<PathBuf> {
    create_unit_at(dir, slug, Utc::now())
}

/// Create a new unit file in `dir` stamped with `now`. Existing files are never overwritten.
pub fn create_unit_at(dir: &Path, slug: &str, now: DateTime<Utc>) -> MigrateResult<PathBuf> {
    let file_name = unit_file_name(slug, now)?;
    debug_assert!(is_unit_file_name(&file_name));

    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| MigrateError::Scaffold(format!("{}: {}", path.display(), e)))?;
    file.write_all(TEMPLATE.as_bytes())?;

    tracing::info!(path = %path.display(), "Created migration");
    Ok(path)
}
