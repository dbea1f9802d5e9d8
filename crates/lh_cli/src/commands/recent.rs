//! Recent changes command.

use super::{format_time, open};
use anyhow::Result;
use console::style;

/// Show the most recent named change sets and what each touched.
pub fn run() -> Result<()> {
    let history = open()?;
    let recent = history.recent_changes()?;

    if recent.is_empty() {
        println!("No named changes yet.");
        return Ok(());
    }

    println!("{}", style("Recent Changes:").bold());
    for change in &recent {
        let differences = history.difference(change.before(), change.after());
        println!();
        println!(
            "{} {}  {}",
            style("●").cyan(),
            style(format_time(change.after().timestamp())).dim(),
            style(change.name()).bold()
        );
        for d in differences.iter().take(10) {
            println!("    {:?} {}", d.kind(), d.path());
        }
        if differences.len() > 10 {
            println!("    ... and {} more", differences.len() - 10);
        }
    }
    Ok(())
}
