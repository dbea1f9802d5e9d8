//! Commands that record structural and content changes.

use super::open;
use anyhow::{bail, Context, Result};
use console::style;
use lh_core::{path, LocalHistory};
use std::fs;
use std::path::Path;

/// Runs `f` inside one change set and saves.
fn record<F>(name: Option<&str>, f: F) -> Result<()>
where
    F: FnOnce(&mut LocalHistory) -> Result<()>,
{
    let mut history = open()?;
    history.begin_change_set()?;
    let result = f(&mut history);
    history.end_change_set(name)?;
    result?;
    history.save()?;
    Ok(())
}

/// Record a file's current content.
///
/// Missing parent directories are recorded too, in the same change set.
pub fn add(file: &str, from: Option<&Path>, message: Option<&str>) -> Result<()> {
    let source = from.unwrap_or_else(|| Path::new(file));
    let content =
        fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    let file = path::normalize(file)?;

    let mut created = false;
    record(message, |history| {
        ensure_parents(history, &file)?;
        match history.find_entry(&file) {
            Some(entry) if entry.is_directory() => bail!("{} is a directory", file),
            Some(_) => history.change_file_content(&file, &content, None)?,
            None => {
                history.create_file(&file, &content, None)?;
                created = true;
            }
        }
        Ok(())
    })?;

    println!(
        "{} {} {} ({} bytes)",
        style("✓").green(),
        if created { "Created" } else { "Updated" },
        style(&file).cyan(),
        content.len()
    );
    Ok(())
}

fn ensure_parents(history: &mut LocalHistory, file: &str) -> Result<()> {
    let segments = path::segments(file)?;
    let mut current = String::new();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        current = path::join(&current, segment);
        if !history.has_entry(&current) {
            history.create_directory(&current)?;
        }
    }
    Ok(())
}

/// Record a new directory.
pub fn mkdir(dir: &str) -> Result<()> {
    record(None, |history| {
        history.create_directory(dir)?;
        Ok(())
    })?;
    println!("{} Created directory {}", style("✓").green(), style(dir).cyan());
    Ok(())
}

/// Record a deletion.
pub fn rm(entry: &str) -> Result<()> {
    record(None, |history| {
        history.delete(entry)?;
        Ok(())
    })?;
    println!("{} Deleted {}", style("✓").green(), style(entry).cyan());
    Ok(())
}

/// Record a move.
pub fn mv(entry: &str, new_parent: &str) -> Result<()> {
    record(None, |history| {
        history.move_entry(entry, new_parent)?;
        Ok(())
    })?;
    let target = if new_parent.is_empty() { "/" } else { new_parent };
    println!(
        "{} Moved {} into {}",
        style("✓").green(),
        style(entry).cyan(),
        style(target).cyan()
    );
    Ok(())
}

/// Record a rename.
pub fn rename(entry: &str, new_name: &str) -> Result<()> {
    record(None, |history| {
        history.rename(entry, new_name)?;
        Ok(())
    })?;
    println!(
        "{} Renamed {} to {}",
        style("✓").green(),
        style(entry).cyan(),
        style(new_name).cyan()
    );
    Ok(())
}
