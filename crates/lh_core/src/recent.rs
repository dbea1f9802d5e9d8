//! Summary of the most recent named activity.

use crate::change::Change;
use crate::change_list::{ChangeList, ChangeSet};
use crate::entry::RootEntry;
use crate::error::Result;
use crate::revisions::{Revision, RevisionCause};
use crate::visitor::ChangeVisitor;
use std::ops::ControlFlow;

/// Most entries returned by [`recent_changes`].
pub const MAX_RECENT_CHANGES: usize = 20;

/// Whole-tree states around one named change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentChange {
    name: String,
    before: Revision,
    after: Revision,
}

impl RecentChange {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root right before the change set.
    pub fn before(&self) -> &Revision {
        &self.before
    }

    /// The root right after the change set.
    pub fn after(&self) -> &Revision {
        &self.after
    }
}

/// Collects up to [`MAX_RECENT_CHANGES`] named, non-label change sets,
/// newest first.
pub(crate) fn recent_changes(list: &ChangeList, live: &RootEntry) -> Result<Vec<RecentChange>> {
    let mut collector = RecentChangesCollector::default();
    list.accept(live, &mut collector)?;
    Ok(collector.result)
}

#[derive(Default)]
struct RecentChangesCollector {
    result: Vec<RecentChange>,
    after: Option<RootEntry>,
}

fn is_listed(change_set: &ChangeSet) -> bool {
    change_set.name().map_or(false, |n| !n.is_empty()) && !change_set.is_label_only()
}

fn root_revision(root: &RootEntry, change_set: &ChangeSet, name: Option<String>) -> Revision {
    Revision::new(
        root.as_entry().clone(),
        String::new(),
        name,
        change_set.timestamp(),
        RevisionCause::ChangeSet(change_set.id()),
    )
}

impl ChangeVisitor for RecentChangesCollector {
    fn begin(&mut self, change_set: &ChangeSet, after: &RootEntry) -> ControlFlow<()> {
        self.after = is_listed(change_set).then(|| after.clone());
        ControlFlow::Continue(())
    }

    // Per-change dispatch is not needed.
    fn visit(&mut self, _change: &Change, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn end(&mut self, change_set: &ChangeSet, before: &RootEntry) -> ControlFlow<()> {
        let (Some(after), Some(name)) = (self.after.take(), change_set.name()) else {
            return ControlFlow::Continue(());
        };
        self.result.push(RecentChange {
            name: name.to_string(),
            before: root_revision(before, change_set, None),
            after: root_revision(&after, change_set, Some(name.to_string())),
        });
        if self.result.len() >= MAX_RECENT_CHANGES {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
