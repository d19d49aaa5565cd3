use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;
use waymark_core::{Direction, RunReport};

use super::{unit_folder, AppContext};

/// Handle `waymark apply`
pub async fn handle_apply(
    ctx: &AppContext,
    dirs: &[PathBuf],
    unit: Option<&Path>,
    force: bool,
) -> Result<()> {
    let force = ctx.force(force);

    if let Some(unit) = unit {
        if !dirs.is_empty() {
            bail!("--dir cannot be combined with a single migration");
        }

        let settings = ctx.settings_for(unit_folder(unit))?;
        let report = ctx
            .migrator
            .apply_one(unit, Direction::Apply, &settings, force)
            .await
            .with_context(|| format!("Failed to apply {}", unit.display()))?;
        print_report(&report);
        return Ok(());
    }

    let dirs = if dirs.is_empty() {
        store_folders(&ctx.config.runner.migrations_root)?
    } else {
        dirs.to_vec()
    };

    let Some(first) = dirs.first() else {
        println!(
            "No migrations directories under {}",
            ctx.config.runner.migrations_root.display()
        );
        return Ok(());
    };

    info!(directories = dirs.len(), force, "Applying pending migrations");
    let settings = ctx.settings_for(first)?;
    let reports = ctx
        .migrator
        .apply_all(&dirs, &settings, force)
        .await
        .context("Migration run halted")?;

    for report in &reports {
        print_report(report);
    }
    Ok(())
}

/// Immediate subdirectories of the migrations root, sorted
pub fn store_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(root)
        .with_context(|| format!("Failed to read migrations root {}", root.display()))?;

    let mut folders = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();
    Ok(folders)
}

pub(crate) fn print_report(report: &RunReport) {
    for name in &report.applied {
        println!("  {} {}", "applied".green(), name);
    }
    for name in &report.reverted {
        println!("  {} {}", "reverted".yellow(), name);
    }

    let summary = format!(
        "{}: {} applied, {} reverted, {} already applied ({} ms)",
        report.store_type,
        report.applied.len(),
        report.reverted.len(),
        report.skipped,
        report.elapsed.as_millis()
    );
    if report.is_empty() {
        println!("{}", summary.as_str().dimmed());
    } else {
        println!("{}", summary.as_str().bold());
    }
}
