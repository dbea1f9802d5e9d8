//! The closed set of changes that can be applied to an entry tree.
//!
//! Every change is recorded with the information needed to undo it: applying
//! a change resolves its subject entry and captures whatever the forward
//! operation destroys (old content, removed subtree). Reverting uses that
//! record, so `revert_on(apply_to(T)) == T` for any change valid against `T`.

use crate::content_id::{Content, ContentId};
use crate::entry::{Entry, EntryId, RootEntry};
use crate::error::{HistoryError, Result};
use crate::path;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeSet;

/// A single recorded mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// A file or directory was created.
    CreateEntry(CreateEntry),
    /// A file's bytes changed.
    ChangeFileContent(ChangeFileContent),
    /// An entry was renamed within its directory.
    Rename(Rename),
    /// An entry was moved to another directory.
    Move(Move),
    /// An entry and its subtree were removed.
    Delete(Delete),
    /// A label was placed; the tree is untouched.
    PutLabel(PutLabel),
}

/// Who placed a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum LabelKind {
    /// Placed explicitly by a user.
    User = 0,
    /// Placed by tooling (builds, test runs, refactorings).
    System = 1,
}

/// What a label applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelScope {
    /// Every entry that exists when the label is placed.
    Global,
    /// One entry and everything below it.
    Entry {
        /// Path of the labeled entry at labeling time.
        path: String,
        /// Id of the labeled entry, resolved when the label is applied.
        id: Option<EntryId>,
    },
}

/// Payload of a created entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatedKind {
    File {
        /// Initial content.
        content: Content,
    },
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEntry {
    id: EntryId,
    path: String,
    kind: CreatedKind,
    timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFileContent {
    path: String,
    new_content: Content,
    timestamp: i64,
    subject: Option<EntryId>,
    /// Content and timestamp before the change.
    old: Option<(Content, i64)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    path: String,
    new_name: String,
    timestamp: i64,
    subject: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    path: String,
    new_parent: String,
    timestamp: i64,
    subject: Option<EntryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    path: String,
    timestamp: i64,
    /// The detached subtree, kept so the deletion can be undone.
    removed: Option<Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutLabel {
    name: String,
    timestamp: i64,
    scope: LabelScope,
    kind: LabelKind,
}

impl CreateEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, CreatedKind::Directory)
    }

    /// Initial content of a created file.
    pub fn content(&self) -> Option<Content> {
        match self.kind {
            CreatedKind::File { content } => Some(content),
            CreatedKind::Directory => None,
        }
    }
}

impl ChangeFileContent {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn new_content(&self) -> Content {
        self.new_content
    }

    /// Content before the change, once applied.
    pub fn old_content(&self) -> Option<Content> {
        self.old.map(|(content, _)| content)
    }
}

impl Rename {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn new_name(&self) -> &str {
        &self.new_name
    }

    /// Path of the entry after the rename.
    pub fn new_path(&self) -> String {
        let (parent, _) = split_or_root(&self.path);
        path::join(&parent, &self.new_name)
    }
}

impl Move {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn new_parent(&self) -> &str {
        &self.new_parent
    }

    /// Path of the entry after the move.
    pub fn new_path(&self) -> String {
        let (_, name) = split_or_root(&self.path);
        path::join(&self.new_parent, &name)
    }
}

impl Delete {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The removed subtree, once applied.
    pub fn removed(&self) -> Option<&Entry> {
        self.removed.as_ref()
    }
}

impl PutLabel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &LabelScope {
        &self.scope
    }

    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_global(&self) -> bool {
        matches!(self.scope, LabelScope::Global)
    }
}

fn split_or_root(p: &str) -> (String, String) {
    path::split_last(p).unwrap_or_default()
}

impl Change {
    /// Creates a file creation change. `id` must be a fresh entry id.
    pub fn create_file(id: EntryId, path: impl Into<String>, content: Content, timestamp: i64) -> Self {
        Change::CreateEntry(CreateEntry {
            id,
            path: path.into(),
            kind: CreatedKind::File { content },
            timestamp,
        })
    }

    /// Creates a directory creation change. `id` must be a fresh entry id.
    pub fn create_directory(id: EntryId, path: impl Into<String>, timestamp: i64) -> Self {
        Change::CreateEntry(CreateEntry {
            id,
            path: path.into(),
            kind: CreatedKind::Directory,
            timestamp,
        })
    }

    pub fn change_file_content(path: impl Into<String>, content: Content, timestamp: i64) -> Self {
        Change::ChangeFileContent(ChangeFileContent {
            path: path.into(),
            new_content: content,
            timestamp,
            subject: None,
            old: None,
        })
    }

    pub fn rename(path: impl Into<String>, new_name: impl Into<String>, timestamp: i64) -> Self {
        Change::Rename(Rename {
            path: path.into(),
            new_name: new_name.into(),
            timestamp,
            subject: None,
        })
    }

    pub fn move_to(path: impl Into<String>, new_parent: impl Into<String>, timestamp: i64) -> Self {
        Change::Move(Move {
            path: path.into(),
            new_parent: new_parent.into(),
            timestamp,
            subject: None,
        })
    }

    pub fn delete(path: impl Into<String>, timestamp: i64) -> Self {
        Change::Delete(Delete {
            path: path.into(),
            timestamp,
            removed: None,
        })
    }

    pub fn put_label(name: impl Into<String>, timestamp: i64, scope: LabelScope, kind: LabelKind) -> Self {
        Change::PutLabel(PutLabel {
            name: name.into(),
            timestamp,
            scope,
            kind,
        })
    }

    /// Time the change was made.
    pub fn timestamp(&self) -> i64 {
        match self {
            Change::CreateEntry(c) => c.timestamp,
            Change::ChangeFileContent(c) => c.timestamp,
            Change::Rename(c) => c.timestamp,
            Change::Move(c) => c.timestamp,
            Change::Delete(c) => c.timestamp,
            Change::PutLabel(c) => c.timestamp,
        }
    }

    pub fn is_label(&self) -> bool {
        matches!(self, Change::PutLabel(_))
    }

    /// Id of the entry this change acts on, once resolved by `apply_to`.
    ///
    /// Global labels have no subject.
    pub fn subject(&self) -> Option<EntryId> {
        match self {
            Change::CreateEntry(c) => Some(c.id),
            Change::ChangeFileContent(c) => c.subject,
            Change::Rename(c) => c.subject,
            Change::Move(c) => c.subject,
            Change::Delete(c) => c.removed.as_ref().map(Entry::id),
            Change::PutLabel(c) => match &c.scope {
                LabelScope::Global => None,
                LabelScope::Entry { id, .. } => *id,
            },
        }
    }

    /// Paths this change touches. Renames and moves report the old and the
    /// new location.
    pub fn affected_paths(&self) -> Vec<String> {
        match self {
            Change::CreateEntry(c) => vec![c.path.clone()],
            Change::ChangeFileContent(c) => vec![c.path.clone()],
            Change::Rename(c) => vec![c.path.clone(), c.new_path()],
            Change::Move(c) => vec![c.path.clone(), c.new_path()],
            Change::Delete(c) => vec![c.path.clone()],
            Change::PutLabel(c) => match &c.scope {
                LabelScope::Global => Vec::new(),
                LabelScope::Entry { path, .. } => vec![path.clone()],
            },
        }
    }

    /// Whether this change concerns the entry whose id path (root excluded)
    /// is `id_path`: its subject is the entry itself or one of its
    /// ancestors. Global labels concern every entry.
    pub fn affects(&self, id_path: &[EntryId]) -> bool {
        match self {
            Change::PutLabel(label) if label.is_global() => true,
            _ => self.subject().map_or(false, |id| id_path.contains(&id)),
        }
    }

    /// Collects every content id this change references, including the
    /// content it replaced or removed.
    pub fn collect_content_ids(&self, out: &mut BTreeSet<ContentId>) {
        match self {
            Change::CreateEntry(c) => {
                if let Some(id) = c.content().and_then(|content| content.id()) {
                    out.insert(id);
                }
            }
            Change::ChangeFileContent(c) => {
                out.extend(c.new_content.id());
                out.extend(c.old_content().and_then(|content| content.id()));
            }
            Change::Delete(c) => {
                if let Some(removed) = &c.removed {
                    removed.collect_content_ids(out);
                }
            }
            Change::Rename(_) | Change::Move(_) | Change::PutLabel(_) => {}
        }
    }

    /// Applies the change to `root`, recording what is needed to revert it.
    ///
    /// On error the tree is left unchanged.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `EntryAlreadyExists`, `NotADirectory`, `NotAFile` or
    /// `InvalidPath` when the change is not valid against `root`.
    pub fn apply_to(&mut self, root: &mut RootEntry) -> Result<()> {
        match self {
            Change::CreateEntry(c) => {
                let (parent, name) = path::split_last(&c.path)?;
                path::validate_name(&name)?;
                let entry = match c.kind {
                    CreatedKind::File { content } => Entry::file(c.id, name, content, c.timestamp),
                    CreatedKind::Directory => Entry::directory(c.id, name),
                };
                root.insert(&parent, entry)
            }
            Change::ChangeFileContent(c) => {
                let entry = root.find_entry_mut(&c.path)?;
                let (Some(content), Some(timestamp)) = (entry.content(), entry.timestamp()) else {
                    return Err(HistoryError::NotAFile(c.path.clone()));
                };
                entry.set_content(c.new_content, c.timestamp)?;
                c.old = Some((content, timestamp));
                c.subject = Some(entry.id());
                Ok(())
            }
            Change::Rename(c) => {
                let (parent, old_name) = path::split_last(&c.path)?;
                path::validate_name(&c.new_name)?;
                let new_path = path::join(&parent, &c.new_name);
                if c.new_name != old_name && root.has_entry(&new_path) {
                    return Err(HistoryError::EntryAlreadyExists(new_path));
                }
                let mut entry = root.remove(&c.path)?;
                c.subject = Some(entry.id());
                entry.set_name(c.new_name.clone());
                root.insert(&parent, entry)
            }
            Change::Move(c) => {
                let (_, name) = path::split_last(&c.path)?;
                let target = root.get_entry(&c.new_parent)?;
                if !target.is_directory() {
                    return Err(HistoryError::NotADirectory(c.new_parent.clone()));
                }
                let moved = root.get_entry(&c.path)?.id();
                if root
                    .id_path_of(target.id())
                    .map_or(false, |ids| ids.contains(&moved))
                {
                    return Err(HistoryError::InvalidPath(format!(
                        "cannot move {} into itself",
                        c.path
                    )));
                }
                let new_path = path::join(&c.new_parent, &name);
                if root.has_entry(&new_path) {
                    return Err(HistoryError::EntryAlreadyExists(new_path));
                }
                let entry = root.remove(&c.path)?;
                c.subject = Some(entry.id());
                root.insert(&c.new_parent, entry)
            }
            Change::Delete(c) => {
                let removed = root.remove(&c.path)?;
                c.removed = Some(removed);
                Ok(())
            }
            Change::PutLabel(c) => {
                if let LabelScope::Entry { path, id } = &mut c.scope {
                    *id = Some(root.get_entry(path)?.id());
                }
                Ok(())
            }
        }
    }

    /// Undoes the change on `root`, which must be the state right after it
    /// was applied.
    ///
    /// # Errors
    ///
    /// `NotApplied` if the change was never applied, or a tree error if
    /// `root` is not the state this change produced.
    pub fn revert_on(&self, root: &mut RootEntry) -> Result<()> {
        match self {
            Change::CreateEntry(c) => {
                root.remove(&c.path)?;
                Ok(())
            }
            Change::ChangeFileContent(c) => {
                let (content, timestamp) = c
                    .old
                    .ok_or_else(|| HistoryError::NotApplied(c.path.clone()))?;
                root.find_entry_mut(&c.path)?.set_content(content, timestamp)
            }
            Change::Rename(c) => {
                let (parent, old_name) = path::split_last(&c.path)?;
                let mut entry = root.remove(&c.new_path())?;
                entry.set_name(old_name);
                root.insert(&parent, entry)
            }
            Change::Move(c) => {
                let (old_parent, _) = path::split_last(&c.path)?;
                let entry = root.remove(&c.new_path())?;
                root.insert(&old_parent, entry)
            }
            Change::Delete(c) => {
                let removed = c
                    .removed
                    .clone()
                    .ok_or_else(|| HistoryError::NotApplied(c.path.clone()))?;
                let (parent, _) = path::split_last(&c.path)?;
                root.insert(&parent, removed)
            }
            Change::PutLabel(_) => Ok(()),
        }
    }
}
