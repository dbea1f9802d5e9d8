//! Purge command.

use super::{format_time, open};
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// Purge history older than a timestamp or an age in days.
pub fn run(before: Option<i64>, days: Option<u32>, yes: bool) -> Result<()> {
    let mut history = open()?;

    let horizon = match (before, days) {
        (Some(ts), _) => ts,
        (None, days) => {
            let days = days.unwrap_or(history.config().purge.retention_days);
            history.now() - days as i64 * 24 * 60 * 60
        }
    };

    let obsolete = history.obsolete_content_count(horizon)?;
    println!(
        "{} Purging history older than {}",
        style("→").cyan(),
        style(format_time(horizon)).cyan()
    );
    println!("  Content blobs to delete: {}", style(obsolete).yellow());

    if !yes {
        // Purged history cannot be recovered
        println!();
        println!(
            "{} {}",
            style("⚠").yellow().bold(),
            style("WARNING:").yellow().bold()
        );
        println!("  Purging permanently deletes old revisions and their content.");
        println!();
        print!("Continue with purge? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("{} Purge cancelled.", style("✓").green());
            return Ok(());
        }
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message("Purging...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = history.purge_obsolete(horizon)?;
    history.save()?;

    spinner.finish_and_clear();

    println!();
    println!("{}", style("Purge Report:").bold());
    println!(
        "  Change sets removed: {}",
        style(report.change_sets_removed).cyan()
    );
    println!(
        "  Contents removed:    {}",
        if report.contents_removed > 0 {
            style(report.contents_removed).yellow()
        } else {
            style(report.contents_removed).green()
        }
    );
    println!(
        "  Contents retained:   {}",
        style(report.contents_retained).green()
    );

    if !report.errors.is_empty() {
        println!();
        println!("{}", style("Errors encountered:").red().bold());
        for error in &report.errors {
            println!("  {} {}", style("×").red(), error);
        }
    }

    Ok(())
}
