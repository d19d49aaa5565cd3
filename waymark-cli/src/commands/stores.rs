use anyhow::Result;
use colored::Colorize;

use super::AppContext;

/// Handle `waymark stores`
pub fn handle_stores(ctx: &AppContext) -> Result<()> {
    let adapters = ctx.migrator.registry().list();
    if adapters.is_empty() {
        println!("No store adapters registered");
        return Ok(());
    }

    for adapter in adapters {
        println!("{:<12} {}", adapter.store_type.as_str().bold(), adapter.description);
    }
    Ok(())
}
