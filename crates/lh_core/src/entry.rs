//! Snapshot of the workspace file/directory hierarchy.

use crate::content_id::{Content, ContentId};
use crate::error::{HistoryError, Result};
use crate::path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique, monotonically assigned entry identifier.
///
/// Id 0 is reserved for the root directory; the facade allocates real
/// entries from 1 upwards and never reuses an id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    /// Id of the root directory.
    pub const ROOT: EntryId = EntryId(0);

    /// Creates an EntryId from its raw value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ids from the root down to an entry, root excluded.
pub type IdPath = Vec<EntryId>;

/// A file or directory node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    id: EntryId,
    name: String,
    kind: EntryKind,
}

/// Variant-specific data of an [`Entry`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File {
        /// Reference to the file bytes.
        content: Content,
        /// Modification time of this content.
        timestamp: i64,
    },
    /// Directory with children sorted by name.
    Directory {
        /// Owned child entries.
        children: Vec<Entry>,
    },
}

impl Entry {
    /// Creates a file entry.
    pub fn file(id: EntryId, name: impl Into<String>, content: Content, timestamp: i64) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::File { content, timestamp },
        }
    }

    /// Creates an empty directory entry.
    pub fn directory(id: EntryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntryKind::Directory {
                children: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &EntryKind {
        &self.kind
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, EntryKind::Directory { .. })
    }

    /// Returns the file content, or `None` for directories.
    pub fn content(&self) -> Option<Content> {
        match &self.kind {
            EntryKind::File { content, .. } => Some(*content),
            EntryKind::Directory { .. } => None,
        }
    }

    /// Returns the file timestamp, or `None` for directories.
    pub fn timestamp(&self) -> Option<i64> {
        match &self.kind {
            EntryKind::File { timestamp, .. } => Some(*timestamp),
            EntryKind::Directory { .. } => None,
        }
    }

    /// Returns the children of a directory (empty for files).
    pub fn children(&self) -> &[Entry] {
        match &self.kind {
            EntryKind::Directory { children } => children,
            EntryKind::File { .. } => &[],
        }
    }

    /// Looks up a direct child by name.
    pub fn find_child(&self, name: &str) -> Option<&Entry> {
        let children = self.children();
        children
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|i| &children[i])
    }

    /// Looks up a descendant by id, including this entry.
    pub fn find_by_id(&self, id: EntryId) -> Option<&Entry> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find_by_id(id))
    }

    /// Collects every content id referenced by this entry and its descendants.
    pub fn collect_content_ids(&self, out: &mut BTreeSet<ContentId>) {
        match &self.kind {
            EntryKind::File { content, .. } => {
                if let Some(id) = content.id() {
                    out.insert(id);
                }
            }
            EntryKind::Directory { children } => {
                for child in children {
                    child.collect_content_ids(out);
                }
            }
        }
    }

    /// Number of entries in this subtree, this entry included.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(Entry::count).sum::<usize>()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_content(&mut self, new_content: Content, new_timestamp: i64) -> Result<()> {
        match &mut self.kind {
            EntryKind::File { content, timestamp } => {
                *content = new_content;
                *timestamp = new_timestamp;
                Ok(())
            }
            EntryKind::Directory { .. } => Err(HistoryError::NotAFile(self.name.clone())),
        }
    }

    fn find_child_mut(&mut self, name: &str) -> Option<&mut Entry> {
        match &mut self.kind {
            EntryKind::Directory { children } => {
                match children.binary_search_by(|c| c.name.as_str().cmp(name)) {
                    Ok(i) => Some(&mut children[i]),
                    Err(_) => None,
                }
            }
            EntryKind::File { .. } => None,
        }
    }

    /// Inserts a child keeping the children sorted by name.
    pub(crate) fn add_child(&mut self, child: Entry) -> Result<()> {
        let own_name = self.name.clone();
        match &mut self.kind {
            EntryKind::Directory { children } => {
                match children.binary_search_by(|c| c.name.as_str().cmp(&child.name)) {
                    Ok(_) => Err(HistoryError::EntryAlreadyExists(child.name)),
                    Err(i) => {
                        children.insert(i, child);
                        Ok(())
                    }
                }
            }
            EntryKind::File { .. } => Err(HistoryError::NotADirectory(own_name)),
        }
    }

    /// Detaches a child by name.
    pub(crate) fn remove_child(&mut self, name: &str) -> Result<Entry> {
        match &mut self.kind {
            EntryKind::Directory { children } => {
                match children.binary_search_by(|c| c.name.as_str().cmp(name)) {
                    Ok(i) => Ok(children.remove(i)),
                    Err(_) => Err(HistoryError::EntryNotFound(name.to_string())),
                }
            }
            EntryKind::File { .. } => Err(HistoryError::NotADirectory(self.name.clone())),
        }
    }

    fn id_path_to(&self, id: EntryId, trail: &mut IdPath) -> bool {
        for child in self.children() {
            trail.push(child.id);
            if child.id == id || child.id_path_to(id, trail) {
                return true;
            }
            trail.pop();
        }
        false
    }
}

/// The root of an entry tree.
///
/// The root is a nameless directory with id [`EntryId::ROOT`]; entries are
/// addressed by workspace-relative paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    root: Entry,
}

impl Default for RootEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl RootEntry {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: Entry::directory(EntryId::ROOT, ""),
        }
    }

    /// Returns the root directory as an entry.
    pub fn as_entry(&self) -> &Entry {
        &self.root
    }

    /// Finds an entry by path; the empty path is the root itself.
    ///
    /// Malformed paths are treated as absent.
    pub fn find_entry(&self, path: &str) -> Option<&Entry> {
        let parts = path::segments(path).ok()?;
        let mut current = &self.root;
        for part in parts {
            current = current.find_child(part)?;
        }
        Some(current)
    }

    /// Returns an entry by path.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if there is no entry at `path`.
    pub fn get_entry(&self, path: &str) -> Result<&Entry> {
        self.find_entry(path)
            .ok_or_else(|| HistoryError::EntryNotFound(path.to_string()))
    }

    /// Checks whether an entry exists at `path`.
    pub fn has_entry(&self, path: &str) -> bool {
        self.find_entry(path).is_some()
    }

    /// Finds an entry by id anywhere in the tree.
    pub fn find_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.root.find_by_id(id)
    }

    /// Returns the ids from the root down to `id` (root excluded).
    pub fn id_path_of(&self, id: EntryId) -> Option<IdPath> {
        if id == EntryId::ROOT {
            return Some(Vec::new());
        }
        let mut trail = Vec::new();
        if self.root.id_path_to(id, &mut trail) {
            Some(trail)
        } else {
            None
        }
    }

    /// Returns the current path of the entry with the given id.
    pub fn path_of(&self, id: EntryId) -> Option<String> {
        let ids = self.id_path_of(id)?;
        let mut names = Vec::with_capacity(ids.len());
        let mut current = &self.root;
        for id in ids {
            current = current.children().iter().find(|c| c.id == id)?;
            names.push(current.name.as_str());
        }
        Some(names.join("/"))
    }

    /// Collects every content id referenced anywhere in the tree.
    pub fn content_ids(&self) -> BTreeSet<ContentId> {
        let mut out = BTreeSet::new();
        self.root.collect_content_ids(&mut out);
        out
    }

    /// Visits every entry below the root, parents before children, with its
    /// path.
    pub fn walk<F: FnMut(&str, &Entry)>(&self, mut f: F) {
        fn go<F: FnMut(&str, &Entry)>(prefix: &str, entry: &Entry, f: &mut F) {
            for child in entry.children() {
                let child_path = path::join(prefix, child.name());
                f(&child_path, child);
                go(&child_path, child, f);
            }
        }
        go("", &self.root, &mut f);
    }

    pub(crate) fn find_entry_mut(&mut self, path: &str) -> Result<&mut Entry> {
        let parts = path::segments(path)?;
        let mut current = &mut self.root;
        for part in parts {
            current = current
                .find_child_mut(part)
                .ok_or_else(|| HistoryError::EntryNotFound(path.to_string()))?;
        }
        Ok(current)
    }

    pub(crate) fn directory_mut(&mut self, path: &str) -> Result<&mut Entry> {
        let entry = self.find_entry_mut(path)?;
        if !entry.is_directory() {
            return Err(HistoryError::NotADirectory(path.to_string()));
        }
        Ok(entry)
    }

    /// Attaches `entry` under the directory at `parent`.
    pub(crate) fn insert(&mut self, parent: &str, entry: Entry) -> Result<()> {
        let child_path = path::join(parent, entry.name());
        self.directory_mut(parent)?
            .add_child(entry)
            .map_err(|e| match e {
                HistoryError::EntryAlreadyExists(_) => HistoryError::EntryAlreadyExists(child_path),
                other => other,
            })
    }

    /// Detaches and returns the entry at `path`.
    pub(crate) fn remove(&mut self, path: &str) -> Result<Entry> {
        let (parent, name) = path::split_last(path)?;
        self.directory_mut(&parent)?
            .remove_child(&name)
            .map_err(|_| HistoryError::EntryNotFound(path.to_string()))
    }
}
