//! Label command.

use super::open;
use anyhow::Result;
use console::style;

/// Put a user label on a path or everything, or a global system label.
pub fn run(name: &str, path: Option<&str>, system: bool) -> Result<()> {
    let mut history = open()?;

    match (path, system) {
        (_, true) => history.put_system_label(name, None)?,
        (Some(path), false) => history.put_user_label(path, name)?,
        (None, false) => history.put_global_user_label(name)?,
    }
    history.save()?;

    let scope = path.unwrap_or("everything");
    println!(
        "{} Labeled {} as {}",
        style("✓").green(),
        style(scope).cyan(),
        style(name).bold()
    );
    Ok(())
}
