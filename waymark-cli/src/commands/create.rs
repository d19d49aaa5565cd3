use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Handle `waymark create`
pub fn handle_create(dir: &Path, slug: &str) -> Result<()> {
    let path = waymark_core::create_unit(dir, slug)
        .with_context(|| format!("Failed to create migration in {}", dir.display()))?;

    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}
