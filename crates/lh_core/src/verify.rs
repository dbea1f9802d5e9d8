//! History integrity checks.
//!
//! Checks that every content blob the change log references can still be
//! read, and finds blobs on disk that nothing references.

use crate::change_list::ChangeList;
use crate::content_id::ContentId;
use crate::content_store::ContentStore;
use crate::entry::RootEntry;
use crate::error::Result;
use std::collections::BTreeSet;
use tracing::debug;

/// Configuration for history verification.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Read and checksum every referenced blob (slow).
    pub check_contents: bool,

    /// Replay the log and compare it with the live tree.
    pub check_replay: bool,

    /// Report blobs on disk that nothing references.
    pub check_orphans: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            check_contents: false,
            check_replay: true,
            check_orphans: true,
        }
    }
}

/// Report from history verification.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of referenced content ids checked.
    pub contents_checked: usize,

    /// Referenced content that no longer exists.
    pub contents_missing: Vec<ContentId>,

    /// Referenced content that fails its checksum or envelope check.
    pub contents_corrupted: Vec<ContentId>,

    /// Blobs on disk referenced by nothing.
    pub contents_orphaned: Vec<ContentId>,

    /// Number of change sets replayed.
    pub change_sets_checked: usize,

    /// Why replaying the log did not reproduce the live tree, if it didn't.
    pub replay_error: Option<String>,
}

impl VerifyReport {
    /// Returns true if any issues were found. Orphaned blobs only waste
    /// space and do not count.
    pub fn has_issues(&self) -> bool {
        !self.contents_missing.is_empty()
            || !self.contents_corrupted.is_empty()
            || self.replay_error.is_some()
    }

    /// Returns a summary message.
    pub fn summary(&self) -> String {
        if !self.has_issues() {
            "History is healthy. No issues found.".to_string()
        } else {
            let mut issues = Vec::new();
            if !self.contents_missing.is_empty() {
                issues.push(format!("{} missing contents", self.contents_missing.len()));
            }
            if !self.contents_corrupted.is_empty() {
                issues.push(format!("{} corrupted contents", self.contents_corrupted.len()));
            }
            if self.replay_error.is_some() {
                issues.push("log does not replay".to_string());
            }
            format!("History has issues: {}", issues.join(", "))
        }
    }
}

/// Verifies the change log against the content store.
///
/// `live` is the in-memory tree the log should replay to.
pub(crate) fn verify(
    list: &ChangeList,
    live: &RootEntry,
    store: &ContentStore,
    config: &VerifyConfig,
) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let referenced = list.content_ids();

    check_references(store, &referenced, config.check_contents, &mut report);

    if config.check_replay {
        check_replay(list, live, &mut report);
    }

    if config.check_orphans {
        for (id, _size) in store.list_all()? {
            if !referenced.contains(&id) {
                report.contents_orphaned.push(id);
            }
        }
    }

    debug!(
        checked = report.contents_checked,
        missing = report.contents_missing.len(),
        corrupted = report.contents_corrupted.len(),
        "verified history"
    );
    Ok(report)
}

fn check_references(
    store: &ContentStore,
    referenced: &BTreeSet<ContentId>,
    read_contents: bool,
    report: &mut VerifyReport,
) {
    for &id in referenced {
        report.contents_checked += 1;

        if !read_contents {
            if !store.exists(id) {
                report.contents_missing.push(id);
            }
            continue;
        }

        match store.get(id) {
            Ok(Some(_)) => {}
            Ok(None) => report.contents_missing.push(id),
            Err(e) => {
                debug!(%id, error = %e, "content failed verification");
                report.contents_corrupted.push(id);
            }
        }
    }
}

fn check_replay(list: &ChangeList, live: &RootEntry, report: &mut VerifyReport) {
    let mut copy = list.clone();
    report.change_sets_checked = copy.len();
    match copy.replay() {
        Ok(root) if &root == live => {}
        Ok(_) => report.replay_error = Some("replayed tree differs from live tree".to_string()),
        Err(e) => report.replay_error = Some(e.to_string()),
    }
}
