//! Newest-to-oldest traversal of the change log.
//!
//! The walk starts from the state after the newest change set and reverts
//! one change at a time, so every callback sees the tree exactly as it was
//! at that point in history. Returning [`ControlFlow::Break`] from any
//! callback stops the walk; [`ChangeVisitor::finished`] is still called.

use crate::change::{Change, ChangeFileContent, CreateEntry, Delete, Move, PutLabel, Rename};
use crate::change_list::{ChangeList, ChangeSet};
use crate::entry::RootEntry;
use crate::error::Result;
use std::ops::ControlFlow;

/// Callbacks for [`ChangeList::accept`].
///
/// All methods default to continuing. `visit` dispatches to the per-kind
/// methods; override it to handle every kind uniformly.
pub trait ChangeVisitor {
    /// Called once with the state after the newest change set.
    fn started(&mut self, _root: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called before the changes of `change_set`, with the state after it.
    fn begin(&mut self, _change_set: &ChangeSet, _after: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called for each change, newest first, with the state right after it.
    fn visit(&mut self, change: &Change, state: &RootEntry) -> ControlFlow<()> {
        match change {
            Change::CreateEntry(c) => self.visit_create(c, state),
            Change::ChangeFileContent(c) => self.visit_content_change(c, state),
            Change::Rename(c) => self.visit_rename(c, state),
            Change::Move(c) => self.visit_move(c, state),
            Change::Delete(c) => self.visit_delete(c, state),
            Change::PutLabel(c) => self.visit_label(c, state),
        }
    }

    fn visit_create(&mut self, _change: &CreateEntry, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_content_change(
        &mut self,
        _change: &ChangeFileContent,
        _state: &RootEntry,
    ) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_rename(&mut self, _change: &Rename, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_move(&mut self, _change: &Move, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_delete(&mut self, _change: &Delete, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn visit_label(&mut self, _change: &PutLabel, _state: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called after the changes of `change_set`, with the state before it.
    fn end(&mut self, _change_set: &ChangeSet, _before: &RootEntry) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called once when the walk ends, however it ends.
    fn finished(&mut self) {}
}

pub(crate) fn walk<V: ChangeVisitor + ?Sized>(
    list: &ChangeList,
    root: &RootEntry,
    visitor: &mut V,
) -> Result<()> {
    let mut state = root.clone();
    let result = walk_from(list, &mut state, visitor);
    visitor.finished();
    result.map(|_| ())
}

fn walk_from<V: ChangeVisitor + ?Sized>(
    list: &ChangeList,
    state: &mut RootEntry,
    visitor: &mut V,
) -> Result<ControlFlow<()>> {
    if visitor.started(state).is_break() {
        return Ok(ControlFlow::Break(()));
    }
    for change_set in list.change_sets().iter().rev() {
        if visitor.begin(change_set, state).is_break() {
            return Ok(ControlFlow::Break(()));
        }
        for change in change_set.changes().iter().rev() {
            if visitor.visit(change, state).is_break() {
                return Ok(ControlFlow::Break(()));
            }
            change.revert_on(state)?;
        }
        if visitor.end(change_set, state).is_break() {
            return Ok(ControlFlow::Break(()));
        }
    }
    Ok(ControlFlow::Continue(()))
}
