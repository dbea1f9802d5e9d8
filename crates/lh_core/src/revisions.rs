//! Per-path revision histories.

use crate::change::{Change, LabelKind};
use crate::change_list::{ChangeList, ChangeSet};
use crate::entry::{Entry, EntryId, RootEntry};
use crate::error::Result;
use crate::visitor::ChangeVisitor;
use std::ops::ControlFlow;

/// Why a revision exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionCause {
    /// A change set that created, changed, renamed or moved the entry (or
    /// renamed/moved one of its ancestors).
    ChangeSet(u64),
    /// A label placed on the entry, one of its ancestors, or globally.
    Label {
        /// Who placed the label.
        kind: LabelKind,
    },
    /// The oldest state still known after history was purged.
    Base,
}

/// A historical snapshot of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    entry: Entry,
    path: String,
    name: Option<String>,
    timestamp: i64,
    cause: RevisionCause,
}

impl Revision {
    pub(crate) fn new(
        entry: Entry,
        path: String,
        name: Option<String>,
        timestamp: i64,
        cause: RevisionCause,
    ) -> Self {
        Self {
            entry,
            path,
            name,
            timestamp,
            cause,
        }
    }

    /// The entry as it was at this revision (with its subtree).
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Path of the entry at this revision.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change set name or label name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn cause(&self) -> RevisionCause {
        self.cause
    }

    pub fn is_label(&self) -> bool {
        matches!(self.cause, RevisionCause::Label { .. })
    }
}

/// Caller-supplied filter for [`crate::LocalHistory::byte_content`].
///
/// Implemented for any `Fn(i64) -> bool`.
pub trait TimestampPredicate {
    fn is_suitable(&self, timestamp: i64) -> bool;
}

impl<F> TimestampPredicate for F
where
    F: Fn(i64) -> bool,
{
    fn is_suitable(&self, timestamp: i64) -> bool {
        self(timestamp)
    }
}

/// Builds the newest-first revision list for the entry at `path` in `live`.
///
/// Returns an empty list if nothing exists at `path`.
pub(crate) fn revisions_for(list: &ChangeList, live: &RootEntry, path: &str) -> Result<Vec<Revision>> {
    let Some(target) = live.find_entry(path).map(Entry::id) else {
        return Ok(Vec::new());
    };

    let mut collector = RevisionsCollector::new(target);
    list.accept(live, &mut collector)?;

    let mut revisions = collector.revisions;
    if !collector.created {
        if let Some(snapshot) = snapshot_of(list.base(), target) {
            let (entry, path) = snapshot;
            revisions.push(Revision::new(
                entry,
                path,
                None,
                list.base_timestamp().unwrap_or_default(),
                RevisionCause::Base,
            ));
        }
    }
    Ok(revisions)
}

fn snapshot_of(root: &RootEntry, id: EntryId) -> Option<(Entry, String)> {
    let entry = root.find_by_id(id)?.clone();
    let path = root.path_of(id)?;
    Some((entry, path))
}

struct RevisionsCollector {
    target: EntryId,
    revisions: Vec<Revision>,
    /// Label revisions of the current change set, newest first.
    labels: Vec<Revision>,
    /// Target snapshot after the current change set.
    after: Option<(Entry, String)>,
    changed: bool,
    created: bool,
}

impl RevisionsCollector {
    fn new(target: EntryId) -> Self {
        Self {
            target,
            revisions: Vec::new(),
            labels: Vec::new(),
            after: None,
            changed: false,
            created: false,
        }
    }
}

impl ChangeVisitor for RevisionsCollector {
    fn begin(&mut self, _change_set: &ChangeSet, after: &RootEntry) -> ControlFlow<()> {
        self.labels.clear();
        self.changed = false;
        self.after = snapshot_of(after, self.target);
        ControlFlow::Continue(())
    }

    fn visit(&mut self, change: &Change, state: &RootEntry) -> ControlFlow<()> {
        // Changes made before the target existed within its creating change set.
        let Some(id_path) = state.id_path_of(self.target) else {
            return ControlFlow::Continue(());
        };
        if !change.affects(&id_path) {
            return ControlFlow::Continue(());
        }

        match change {
            Change::PutLabel(label) => {
                if let Some((entry, path)) = snapshot_of(state, self.target) {
                    self.labels.push(Revision::new(
                        entry,
                        path,
                        Some(label.name().to_string()),
                        label.timestamp(),
                        RevisionCause::Label { kind: label.kind() },
                    ));
                }
            }
            Change::CreateEntry(create) => {
                self.changed = true;
                self.created |= create.id() == self.target;
            }
            _ => self.changed = true,
        }
        ControlFlow::Continue(())
    }

    fn end(&mut self, change_set: &ChangeSet, _before: &RootEntry) -> ControlFlow<()> {
        self.revisions.append(&mut self.labels);
        if self.changed {
            if let Some((entry, path)) = self.after.take() {
                self.revisions.push(Revision::new(
                    entry,
                    path,
                    change_set.name().map(str::to_string),
                    change_set.timestamp(),
                    RevisionCause::ChangeSet(change_set.id()),
                ));
            }
        }
        if self.created {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
