//! Commands that read the history of one path.

use super::{format_time, open};
use anyhow::{bail, Context, Result};
use console::style;
use lh_core::{DifferenceKind, Revision, RevisionCause};
use serde_json::json;
use std::io::{self, Write};

fn describe(revision: &Revision) -> String {
    match revision.cause() {
        RevisionCause::ChangeSet(id) => format!("change set {}", id),
        RevisionCause::Label { kind } => format!("{:?} label", kind).to_lowercase(),
        RevisionCause::Base => "oldest retained state".to_string(),
    }
}

/// Show the revisions of a path.
pub fn history(path: &str, format: &str) -> Result<()> {
    let history = open()?;
    let revisions = history.revisions_for(path)?;

    match format {
        "json" => {
            let items: Vec<_> = revisions
                .iter()
                .enumerate()
                .map(|(index, r)| {
                    json!({
                        "index": index,
                        "timestamp": r.timestamp(),
                        "name": r.name(),
                        "path": r.path(),
                        "cause": describe(r),
                        "entry_id": r.entry().id().get(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        "text" => {
            if revisions.is_empty() {
                println!("No history for {}", style(path).cyan());
                return Ok(());
            }
            println!("{} ({} revisions)", style(path).bold(), revisions.len());
            println!();
            for (index, r) in revisions.iter().enumerate() {
                let marker = if r.is_label() {
                    style("◆").yellow()
                } else {
                    style("●").cyan()
                };
                println!(
                    "{} [{}] {}  {}",
                    marker,
                    index,
                    style(format_time(r.timestamp())).dim(),
                    r.name().unwrap_or("")
                );
                println!("      {} ({})", r.path(), describe(r));
            }
        }
        other => bail!("Unknown format: {} (expected text or json)", other),
    }
    Ok(())
}

/// Print a file's content, optionally as of a point in time.
pub fn show(path: &str, at: Option<i64>) -> Result<()> {
    let history = open()?;
    let bytes = match at {
        Some(at) => history.byte_content(path, |t: i64| t <= at)?,
        None => history.byte_content(path, |_: i64| true)?,
    };
    let bytes = bytes.with_context(|| format!("No content available for {}", path))?;
    io::stdout().write_all(&bytes)?;
    Ok(())
}

/// Show differences between two revisions of a path.
pub fn diff(path: &str, from: usize, to: usize) -> Result<()> {
    let history = open()?;
    let revisions = history.revisions_for(path)?;
    let (Some(older), Some(newer)) = (revisions.get(from), revisions.get(to)) else {
        bail!(
            "{} has {} revisions; indexes {} and {} are not both valid",
            path,
            revisions.len(),
            from,
            to
        );
    };

    let differences = history.difference(older, newer);
    if differences.is_empty() {
        println!("{} No differences", style("✓").green());
        return Ok(());
    }

    for d in &differences {
        let shown = if d.path().is_empty() { path } else { d.path() };
        let (marker, label) = match d.kind() {
            DifferenceKind::Added => (style("+").green(), "added"),
            DifferenceKind::Removed => (style("-").red(), "removed"),
            DifferenceKind::Modified => (style("~").yellow(), "modified"),
        };
        println!("{} {} ({})", marker, shown, label);
    }
    Ok(())
}
