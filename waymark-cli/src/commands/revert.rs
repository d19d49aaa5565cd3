use anyhow::{Context, Result};
use std::path::Path;
use waymark_core::Direction;

use super::apply::print_report;
use super::{unit_folder, AppContext};

/// Handle `waymark revert`
pub async fn handle_revert(ctx: &AppContext, unit: &Path, force: bool) -> Result<()> {
    let settings = ctx.settings_for(unit_folder(unit))?;
    let report = ctx
        .migrator
        .apply_one(unit, Direction::Revert, &settings, ctx.force(force))
        .await
        .with_context(|| format!("Failed to revert {}", unit.display()))?;

    print_report(&report);
    Ok(())
}
