//! Entry-level differences between two snapshots.

use crate::content_id::Content;
use crate::entry::Entry;
use crate::path;
use std::collections::BTreeMap;

/// How an entry differs between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Present only in the newer snapshot.
    Added,
    /// Present only in the older snapshot.
    Removed,
    /// Present in both with different content or type.
    Modified,
}

/// One differing entry.
///
/// `path` is relative to the compared entries; the compared entries
/// themselves have the empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    path: String,
    kind: DifferenceKind,
    older: Option<Entry>,
    newer: Option<Entry>,
}

impl Difference {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> DifferenceKind {
        self.kind
    }

    pub fn older(&self) -> Option<&Entry> {
        self.older.as_ref()
    }

    pub fn newer(&self) -> Option<&Entry> {
        self.newer.as_ref()
    }

    /// Content on each side, for file differences.
    pub fn contents(&self) -> (Option<Content>, Option<Content>) {
        (
            self.older.as_ref().and_then(Entry::content),
            self.newer.as_ref().and_then(Entry::content),
        )
    }
}

/// Compares two snapshots of an entry by relative path.
///
/// Directories present on both sides are not reported themselves; their
/// children are. Results are sorted by path.
pub fn differences(older: &Entry, newer: &Entry) -> Vec<Difference> {
    let older_entries = flatten(older);
    let mut newer_entries = flatten(newer);
    let mut result = Vec::new();

    for (rel, old) in older_entries {
        match newer_entries.remove(&rel) {
            None => result.push(Difference {
                path: rel,
                kind: DifferenceKind::Removed,
                older: Some(old.clone()),
                newer: None,
            }),
            Some(new) => {
                let modified = match (old.is_directory(), new.is_directory()) {
                    (true, true) => false,
                    (false, false) => old.content() != new.content(),
                    _ => true,
                };
                if modified {
                    result.push(Difference {
                        path: rel,
                        kind: DifferenceKind::Modified,
                        older: Some(old.clone()),
                        newer: Some(new.clone()),
                    });
                }
            }
        }
    }

    for (rel, new) in newer_entries {
        result.push(Difference {
            path: rel,
            kind: DifferenceKind::Added,
            older: None,
            newer: Some(new.clone()),
        });
    }

    result.sort_by(|a, b| a.path.cmp(&b.path));
    result
}

fn flatten(top: &Entry) -> BTreeMap<String, &Entry> {
    fn go<'a>(prefix: &str, entry: &'a Entry, out: &mut BTreeMap<String, &'a Entry>) {
        for child in entry.children() {
            let rel = path::join(prefix, child.name());
            go(&rel, child, out);
            out.insert(rel, child);
        }
    }

    let mut out = BTreeMap::new();
    out.insert(String::new(), top);
    go("", top, &mut out);
    out
}
