//! CLI commands.

use anyhow::{Context, Result};
use chrono::DateTime;
use lh_core::LocalHistory;

pub mod edit;
pub mod history;
pub mod init;
pub mod label;
pub mod purge;
pub mod recent;
pub mod verify;

/// Opens the history of the current directory.
pub(crate) fn open() -> Result<LocalHistory> {
    LocalHistory::open(".").context("Not a local history workspace (run `lh init`)")
}

/// Renders a Unix timestamp for display.
pub(crate) fn format_time(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}
