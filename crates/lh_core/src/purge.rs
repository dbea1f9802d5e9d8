//! Removal of history older than a retention horizon.
//!
//! Purging works in two phases:
//! 1. **Fold**: every leading change set strictly older than the horizon is
//!    applied to the base snapshot and dropped from the log.
//! 2. **Sweep**: content referenced by the dropped change sets or the old
//!    base is deleted unless the new base or a retained change set still
//!    references it.
//!
//! Everything at or after the horizon stays reconstructable, including every
//! label placed at or after it and the current state of each entry.

use crate::change_list::ChangeList;
use crate::content_id::ContentId;
use crate::content_store::ContentStore;
use crate::error::Result;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Report from a purge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PurgeReport {
    /// Number of change sets folded into the base and dropped.
    pub change_sets_removed: usize,

    /// Number of content blobs deleted.
    pub contents_removed: usize,

    /// Number of content blobs still referenced after the purge.
    pub contents_retained: usize,

    /// Errors encountered while deleting blobs (non-fatal).
    pub errors: Vec<String>,
}

/// Purges `list` and `store` up to `horizon`.
///
/// Running it again with the same horizon changes nothing.
///
/// # Errors
///
/// Fails only if the dropped change sets cannot be folded into the base,
/// in which case nothing was changed. Blob deletion failures are recorded
/// in [`PurgeReport::errors`].
pub(crate) fn purge(list: &mut ChangeList, store: &mut ContentStore, horizon: i64) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();

    let mut candidates = list.base().content_ids();
    let dropped = list.drop_before(horizon)?;
    if dropped.is_empty() {
        debug!(horizon, "nothing to purge");
        report.contents_retained = list.content_ids().len();
        return Ok(report);
    }
    for change_set in &dropped {
        change_set.collect_content_ids(&mut candidates);
    }
    report.change_sets_removed = dropped.len();

    let keep = list.content_ids();
    report.contents_retained = keep.len();
    sweep(store, candidates.difference(&keep), &mut report);

    info!(
        horizon,
        change_sets = report.change_sets_removed,
        contents = report.contents_removed,
        "purged history"
    );
    Ok(report)
}

fn sweep<'a>(
    store: &mut ContentStore,
    obsolete: impl Iterator<Item = &'a ContentId>,
    report: &mut PurgeReport,
) {
    for &id in obsolete {
        match store.remove(id) {
            Ok(true) => report.contents_removed += 1,
            Ok(false) => {}
            Err(e) => {
                warn!(%id, error = %e, "failed to remove purged content");
                report
                    .errors
                    .push(format!("Failed to delete content {}: {}", id, e));
            }
        }
    }
}

/// Content ids that a purge at `horizon` would delete, without changing
/// anything.
pub(crate) fn obsolete_contents(list: &ChangeList, horizon: i64) -> Result<BTreeSet<ContentId>> {
    let mut preview = list.clone();
    let mut candidates = preview.base().content_ids();
    for change_set in preview.drop_before(horizon)? {
        change_set.collect_content_ids(&mut candidates);
    }
    let keep = preview.content_ids();
    Ok(candidates.difference(&keep).copied().collect())
}
