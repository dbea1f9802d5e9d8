use super::assertions::Assertion;
use super::clock::MockClock;
use super::steps::ScenarioStep;
use super::workspace::TestWorkspace;
use anyhow::{anyhow, Context, Result};
use lh_core::{path, LocalHistory, VerifyConfig};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::time::Duration;

/// Executes scenarios against a real LocalHistory instance
pub struct ScenarioRunner {
    workspace: TestWorkspace,
    history: Option<LocalHistory>,
    clock: MockClock,
    marks: HashMap<String, i64>,
    crashed: bool,
    current_step: usize,
}

impl ScenarioRunner {
    /// Create a new runner with initial files
    pub fn new(initial_files: &BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = TestWorkspace::with_files(initial_files)?;
        let clock = MockClock::new();
        let history = workspace
            .init_history()?
            .with_time_provider(clock.as_provider());

        Ok(Self {
            workspace,
            history: Some(history),
            clock,
            marks: HashMap::new(),
            crashed: false,
            current_step: 0,
        })
    }

    /// Get current step number
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Execute all steps in sequence
    pub fn execute(&mut self, steps: &[ScenarioStep]) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            self.current_step = i;
            self.execute_step(step)
                .with_context(|| format!("Step {}: {:?}", i, step))?;
        }
        Ok(())
    }

    fn history(&mut self) -> Result<&mut LocalHistory> {
        self.history
            .as_mut()
            .ok_or_else(|| anyhow!("History not available (crashed?)"))
    }

    /// Execute a single step
    fn execute_step(&mut self, step: &ScenarioStep) -> Result<()> {
        match step {
            ScenarioStep::ImportWorkspace { name } => self.handle_import(name),
            ScenarioStep::CreateFile { path, content } => self.handle_create_file(path, content),
            ScenarioStep::EditFile { path, content } => self.handle_edit_file(path, content),
            ScenarioStep::CreateDirectory { path } => {
                fs::create_dir_all(self.workspace.path().join(path))?;
                self.history()?.create_directory(path)?;
                Ok(())
            }
            ScenarioStep::Delete { path } => self.handle_delete(path),
            ScenarioStep::Rename { path, new_name } => self.handle_rename(path, new_name),
            ScenarioStep::Move { path, new_parent } => self.handle_move(path, new_parent),

            ScenarioStep::BeginChangeSet => Ok(self.history()?.begin_change_set()?),
            ScenarioStep::EndChangeSet { name } => {
                Ok(self.history()?.end_change_set(name.as_deref())?)
            }

            ScenarioStep::Label { path, name } => {
                let history = self.history()?;
                match path {
                    Some(path) => history.put_user_label(path, name)?,
                    None => history.put_global_user_label(name)?,
                }
                Ok(())
            }
            ScenarioStep::SystemLabel { name } => {
                Ok(self.history()?.put_system_label(name, None)?)
            }

            ScenarioStep::Save => {
                self.history()?.save()?;
                Ok(())
            }
            ScenarioStep::Purge { older_than } => {
                self.history()?.purge_older_than(*older_than)?;
                Ok(())
            }
            ScenarioStep::PurgeWithConfig => {
                self.history()?.purge_with_config()?;
                Ok(())
            }

            ScenarioStep::Wait { duration } => self.handle_wait(*duration),
            ScenarioStep::WaitHours { hours } => {
                self.handle_wait(Duration::from_secs(hours * 3600))
            }
            ScenarioStep::WaitDays { days } => self.handle_wait(Duration::from_secs(days * 86400)),
            ScenarioStep::Mark { name } => {
                self.marks.insert(name.clone(), self.clock.now());
                Ok(())
            }

            ScenarioStep::Crash => self.handle_crash(),
            ScenarioStep::Restart => self.handle_restart(),

            ScenarioStep::Assert { assertion } => self.handle_assertion(assertion),
        }
    }

    // ===== Workspace action handlers =====

    fn handle_import(&mut self, name: &str) -> Result<()> {
        let files = self.workspace.list_files()?;
        let mut contents = Vec::with_capacity(files.len());
        for file in files {
            let content = self.workspace.read_file(&file)?;
            contents.push((file, content));
        }

        let history = self.history()?;
        history.begin_change_set()?;
        for (file, content) in &contents {
            ensure_parents(history, file)?;
            history.create_file(file, content, None)?;
        }
        history.end_change_set(Some(name))?;
        Ok(())
    }

    fn handle_create_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        self.workspace.write_file(path, content)?;
        let history = self.history()?;
        ensure_parents(history, path)?;
        history.create_file(path, content, None)?;
        Ok(())
    }

    fn handle_edit_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        self.workspace.write_file(path, content)?;
        self.history()?.change_file_content(path, content, None)?;
        Ok(())
    }

    fn handle_delete(&mut self, path: &str) -> Result<()> {
        let full_path = self.workspace.path().join(path);
        if full_path.is_dir() {
            fs::remove_dir_all(&full_path)?;
        } else if full_path.exists() {
            fs::remove_file(&full_path)?;
        }
        self.history()?.delete(path)?;
        Ok(())
    }

    fn handle_rename(&mut self, path: &str, new_name: &str) -> Result<()> {
        let (parent, _) = path::split_last(path)?;
        let target = path::join(&parent, new_name);
        self.move_on_disk(path, &target)?;
        self.history()?.rename(path, new_name)?;
        Ok(())
    }

    fn handle_move(&mut self, path: &str, new_parent: &str) -> Result<()> {
        let (_, name) = path::split_last(path)?;
        let target = path::join(new_parent, &name);
        self.move_on_disk(path, &target)?;
        self.history()?.move_entry(path, new_parent)?;
        Ok(())
    }

    fn move_on_disk(&self, from: &str, to: &str) -> Result<()> {
        let from = self.workspace.path().join(from);
        if from.exists() {
            fs::rename(&from, self.workspace.path().join(to))?;
        }
        Ok(())
    }

    fn handle_wait(&mut self, duration: Duration) -> Result<()> {
        self.clock.advance(duration);
        Ok(())
    }

    // ===== Failure simulation =====

    fn handle_crash(&mut self) -> Result<()> {
        // Drop history without saving
        self.history = None;
        self.crashed = true;
        Ok(())
    }

    fn handle_restart(&mut self) -> Result<()> {
        if !self.crashed {
            return Err(anyhow!("Cannot restart - not crashed"));
        }

        // Reopen with time provider
        let history = self
            .workspace
            .open_history()?
            .with_time_provider(self.clock.as_provider());

        self.history = Some(history);
        self.crashed = false;

        Ok(())
    }

    // ===== Assertions =====

    fn handle_assertion(&mut self, assertion: &Assertion) -> Result<()> {
        if let Assertion::NoPanic = assertion {
            // If we're here, we didn't panic
            return Ok(());
        }
        if let Assertion::Custom(f) = assertion {
            // Custom assertions get mutable access
            return f(self.history()?);
        }

        let history = self
            .history
            .as_ref()
            .ok_or_else(|| anyhow!("History not available"))?;

        match assertion {
            Assertion::EntryExists { path } => {
                if !history.has_entry(path) {
                    return Err(anyhow!("Entry '{}' not found", path));
                }
                Ok(())
            }
            Assertion::EntryMissing { path } => {
                if history.has_entry(path) {
                    return Err(anyhow!("Entry '{}' unexpectedly exists", path));
                }
                Ok(())
            }
            Assertion::ContentEquals { path, content } => {
                let actual = history
                    .byte_content(path, |_: i64| true)?
                    .ok_or_else(|| anyhow!("No content for '{}'", path))?;
                if &actual != content {
                    return Err(anyhow!(
                        "Content mismatch for '{}': expected {:?}, got {:?}",
                        path,
                        String::from_utf8_lossy(content),
                        String::from_utf8_lossy(&actual)
                    ));
                }
                Ok(())
            }
            Assertion::RevisionCount { path, count } => {
                let actual = history.revisions_for(path)?.len();
                if actual != *count {
                    return Err(anyhow!(
                        "Revision count mismatch for '{}': expected {}, got {}",
                        path,
                        count,
                        actual
                    ));
                }
                Ok(())
            }
            Assertion::RevisionNames { path, names } => {
                let actual: Vec<Option<String>> = history
                    .revisions_for(path)?
                    .iter()
                    .map(|r| r.name().map(String::from))
                    .collect();
                if &actual != names {
                    return Err(anyhow!(
                        "Revision names mismatch for '{}': expected {:?}, got {:?}",
                        path,
                        names,
                        actual
                    ));
                }
                Ok(())
            }
            Assertion::ContentAtMark {
                path,
                mark,
                content,
            } => {
                let at = *self
                    .marks
                    .get(mark)
                    .ok_or_else(|| anyhow!("Unknown mark '{}'", mark))?;
                let actual = history.byte_content(path, |t: i64| t <= at)?;
                if &actual != content {
                    return Err(anyhow!(
                        "Content of '{}' at '{}' mismatch: expected {:?}, got {:?}",
                        path,
                        mark,
                        content.as_deref().map(String::from_utf8_lossy),
                        actual.as_deref().map(String::from_utf8_lossy)
                    ));
                }
                Ok(())
            }
            Assertion::ChangeSetCount(expected) => {
                let count = history.change_list().len();
                if count != *expected {
                    return Err(anyhow!(
                        "Change set count mismatch: expected {}, got {}",
                        expected,
                        count
                    ));
                }
                Ok(())
            }
            Assertion::RecentNames(expected) => {
                let actual: Vec<String> = history
                    .recent_changes()?
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                if &actual != expected {
                    return Err(anyhow!(
                        "Recent changes mismatch: expected {:?}, got {:?}",
                        expected,
                        actual
                    ));
                }
                Ok(())
            }
            Assertion::Dirty(expected) => {
                if history.is_dirty() != *expected {
                    return Err(anyhow!(
                        "Dirty flag mismatch: expected {}, got {}",
                        expected,
                        history.is_dirty()
                    ));
                }
                Ok(())
            }
            Assertion::VerifyClean => {
                let config = VerifyConfig {
                    check_contents: true,
                    ..VerifyConfig::default()
                };
                let report = history.verify(&config)?;
                if report.has_issues() {
                    return Err(anyhow!("Verification failed: {}", report.summary()));
                }
                Ok(())
            }
            Assertion::NoPanic | Assertion::Custom(_) => Ok(()),
        }
    }
}

/// Records any missing ancestor directories of `file`.
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
