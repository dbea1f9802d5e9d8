//! Initialize local history.

use anyhow::{Context, Result};
use lh_core::LocalHistory;

/// Initialize local history in the current directory.
pub fn run() -> Result<()> {
    let mut history = LocalHistory::init(".").context("Failed to initialize local history")?;
    let retention = history.config().purge.retention_days;
    history.close()?;

    println!("Initialized local history in .lh/");
    println!();
    println!("Directory structure:");
    println!("  .lh/state        - Change log and counters");
    println!("  .lh/contents/    - Content blobs");
    println!();
    println!("Configuration written to .lh/config.toml");
    println!("  Retention: {} days", retention);

    Ok(())
}
