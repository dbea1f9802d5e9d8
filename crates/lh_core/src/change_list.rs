//! Change sets, the append-only change log, and change set nesting.

use crate::change::Change;
use crate::content_id::ContentId;
use crate::entry::RootEntry;
use crate::error::{HistoryError, Result};
use crate::visitor::{self, ChangeVisitor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// An atomically committed group of changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    id: u64,
    name: Option<String>,
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Wraps applied changes. Returns `None` for an empty group.
    pub(crate) fn new(id: u64, name: Option<String>, changes: Vec<Change>) -> Option<Self> {
        if changes.is_empty() {
            return None;
        }
        Some(Self { id, name, changes })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Effective timestamp: that of the last change.
    pub fn timestamp(&self) -> i64 {
        self.changes.last().map_or(0, Change::timestamp)
    }

    /// True if every change is a label.
    pub fn is_label_only(&self) -> bool {
        self.changes.iter().all(Change::is_label)
    }

    pub fn collect_content_ids(&self, out: &mut BTreeSet<ContentId>) {
        for change in &self.changes {
            change.collect_content_ids(out);
        }
    }

    fn apply_to(&mut self, root: &mut RootEntry) -> Result<()> {
        let id = self.id;
        for change in &mut self.changes {
            change
                .apply_to(root)
                .map_err(|e| HistoryError::ReplayFailed {
                    change_set: id,
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// The ordered log of committed change sets.
///
/// The live tree is `base` with every change set applied in order. `base`
/// is empty until history is purged; purging folds the dropped change sets
/// into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeList {
    base: RootEntry,
    /// Timestamp of the newest change set folded into `base`.
    base_timestamp: Option<i64>,
    change_sets: Vec<ChangeSet>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tree state preceding the oldest retained change set.
    pub fn base(&self) -> &RootEntry {
        &self.base
    }

    pub fn base_timestamp(&self) -> Option<i64> {
        self.base_timestamp
    }

    /// Retained change sets, oldest first.
    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }

    pub fn len(&self) -> usize {
        self.change_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }

    pub(crate) fn push(&mut self, change_set: ChangeSet) {
        self.change_sets.push(change_set);
    }

    /// Rebuilds the live tree by applying every change set to the base.
    ///
    /// # Errors
    ///
    /// Returns `ReplayFailed` naming the first change set that does not
    /// apply.
    pub fn replay(&mut self) -> Result<RootEntry> {
        let mut root = self.base.clone();
        for change_set in &mut self.change_sets {
            change_set.apply_to(&mut root)?;
        }
        debug!(change_sets = self.change_sets.len(), "replayed change log");
        Ok(root)
    }

    /// Walks the log newest to oldest starting from `root`, the state after
    /// the newest change set. See [`ChangeVisitor`].
    pub fn accept<V: ChangeVisitor + ?Sized>(&self, root: &RootEntry, visitor: &mut V) -> Result<()> {
        visitor::walk(self, root, visitor)
    }

    /// Content ids referenced by the base or any retained change set.
    pub fn content_ids(&self) -> BTreeSet<ContentId> {
        let mut ids = self.base.content_ids();
        for change_set in &self.change_sets {
            change_set.collect_content_ids(&mut ids);
        }
        ids
    }

    /// Folds change sets older than `horizon` into the base and returns
    /// them.
    ///
    /// Timestamps come from callers and may be out of order, so the fold
    /// runs through the last change set older than the horizon; any newer
    /// change set before it goes into the base too. Retained change sets
    /// keep their ids and order. The base takes the newest folded
    /// timestamp.
    pub(crate) fn drop_before(&mut self, horizon: i64) -> Result<Vec<ChangeSet>> {
        let cut = match self
            .change_sets
            .iter()
            .rposition(|cs| cs.timestamp() < horizon)
        {
            Some(last) => last + 1,
            None => return Ok(Vec::new()),
        };

        let mut base = self.base.clone();
        for change_set in &mut self.change_sets[..cut] {
            change_set.apply_to(&mut base)?;
        }

        let dropped: Vec<ChangeSet> = self.change_sets.drain(..cut).collect();
        self.base = base;
        self.base_timestamp = dropped
            .iter()
            .map(ChangeSet::timestamp)
            .chain(self.base_timestamp)
            .max();
        Ok(dropped)
    }
}

/// Nesting state of `begin_change_set` / `end_change_set`.
///
/// Owned by one [`crate::LocalHistory`]. While open, recorded changes are
/// buffered; the outermost `end` turns the buffer into one change set.
#[derive(Debug, Default)]
pub struct ChangeSetContext {
    depth: u32,
    pending: Vec<Change>,
}

impl ChangeSetContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_open(&self) -> bool {
        self.depth > 0
    }

    /// Buffered changes, oldest first.
    pub fn pending(&self) -> &[Change] {
        &self.pending
    }

    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Records an applied change.
    ///
    /// Returns the change back when no change set is open, meaning it must
    /// be committed on its own.
    pub fn record(&mut self, change: Change) -> Option<Change> {
        if self.is_open() {
            self.pending.push(change);
            None
        } else {
            Some(change)
        }
    }

    /// Closes one nesting level.
    ///
    /// At the outermost level returns the buffered changes; inner levels
    /// return an empty vector and their name is discarded by the caller.
    ///
    /// # Errors
    ///
    /// Returns `ChangeSetNotStarted` if no change set is open.
    pub fn end(&mut self) -> Result<Vec<Change>> {
        if self.depth == 0 {
            return Err(HistoryError::ChangeSetNotStarted);
        }
        self.depth -= 1;
        if self.depth == 0 {
            Ok(std::mem::take(&mut self.pending))
        } else {
            Ok(Vec::new())
        }
    }

    /// Drops any open change set and its buffer.
    pub(crate) fn reset(&mut self) {
        self.depth = 0;
        self.pending.clear();
    }
}
