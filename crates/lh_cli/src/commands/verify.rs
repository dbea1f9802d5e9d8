//! History verification command.

use super::open;
use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use lh_core::VerifyConfig;

/// Verify history integrity.
pub fn run(contents: bool) -> Result<()> {
    let history = open()?;

    let config = VerifyConfig {
        check_contents: contents,
        ..VerifyConfig::default()
    };

    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(if contents {
        "Verifying content integrity..."
    } else {
        "Verifying history..."
    });
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let report = history.verify(&config)?;

    spinner.finish_and_clear();

    println!();
    println!("{}", style("Verification Report:").bold());
    println!(
        "  Contents checked:    {}",
        style(report.contents_checked).cyan()
    );
    if !report.contents_missing.is_empty() {
        println!(
            "  Missing contents:    {}",
            style(report.contents_missing.len()).red()
        );
        for id in &report.contents_missing {
            println!("    {} {}", style("×").red(), id);
        }
    }
    if !report.contents_corrupted.is_empty() {
        println!(
            "  Corrupted contents:  {}",
            style(report.contents_corrupted.len()).red()
        );
        for id in &report.contents_corrupted {
            println!("    {} {}", style("×").red(), id);
        }
    }
    if !report.contents_orphaned.is_empty() {
        println!(
            "  Orphaned contents:   {}",
            style(report.contents_orphaned.len()).yellow()
        );
    }
    println!(
        "  Change sets checked: {}",
        style(report.change_sets_checked).cyan()
    );
    if let Some(reason) = &report.replay_error {
        println!("  Replay:              {}", style(reason).red());
    }

    println!();
    if report.has_issues() {
        println!("{}", style(&report.summary()).yellow().bold());
        println!();
        println!("{}", style("Recommendations:").bold());
        println!(
            "  {} Missing or corrupted contents make some old revisions unreadable",
            style("→").cyan()
        );
        println!(
            "  {} Run {} to drop history older than the damage",
            style("→").cyan(),
            style("lh purge --before <timestamp>").cyan()
        );
    } else {
        println!(
            "{} {}",
            style("✓").green(),
            style(&report.summary()).green()
        );
    }

    Ok(())
}
