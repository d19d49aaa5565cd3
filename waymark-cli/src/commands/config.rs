use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use waymark_config::{SettingsDiscovery, WaymarkConfig};

use super::AppContext;

/// Handle `waymark config sample`
pub fn handle_config_sample() -> Result<()> {
    print!("{}", WaymarkConfig::generate_sample());
    Ok(())
}

/// Handle `waymark config validate`
pub fn handle_config_validate(ctx: &AppContext, dir: Option<&Path>) -> Result<()> {
    ctx.config
        .validate_all()
        .context("Configuration validation failed")?;
    println!("{}", "✓ Configuration is valid".green());

    let folder = dir.unwrap_or(ctx.config.runner.migrations_root.as_path());
    let discovered = SettingsDiscovery::from_config(&ctx.config.runner)
        .discover(folder)
        .with_context(|| format!("Failed to load store settings for {}", folder.display()))?;

    match &discovered.base {
        Some(path) => println!("Settings:        {}", path.display()),
        None => println!("Settings:        {}", "none found".dimmed()),
    }
    match &discovered.secrets {
        Some(path) => println!("Secrets overlay: {}", path.display()),
        None => println!("Secrets overlay: {}", "none found".dimmed()),
    }
    println!("Top-level keys:  {}", discovered.settings.len());
    Ok(())
}
