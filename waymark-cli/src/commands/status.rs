use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::AppContext;

/// Handle `waymark status`
pub async fn handle_status(ctx: &AppContext, dir: &Path) -> Result<()> {
    let settings = ctx.settings_for(dir)?;
    let statuses = ctx
        .migrator
        .status(dir, &settings)
        .await
        .with_context(|| format!("Failed to read status of {}", dir.display()))?;

    if statuses.is_empty() {
        println!("No migrations in {}", dir.display());
        return Ok(());
    }

    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let pending = statuses.iter().filter(|s| !s.applied).count();

    for status in &statuses {
        let state = if status.applied {
            "applied".green()
        } else {
            "pending".yellow()
        };
        println!("{:<width$}  {}", status.name, state, width = width);
    }

    println!("\n{} migrations, {} pending", statuses.len(), pending);
    Ok(())
}
