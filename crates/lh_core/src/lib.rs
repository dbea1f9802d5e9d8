//! Local History Core Library
//!
//! A per-workspace versioning engine that records every change made to a
//! tree of files and directories, providing:
//! - An append-only log of change sets with full undo information
//! - Per-entry revision history, including labels
//! - Time-bounded content retrieval
//! - Retention-based purging of old history
//!
//! # Quick Start
//!
//! ```
//! use lh_core::LocalHistory;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut history = LocalHistory::init(tmp.path()).unwrap();
//!
//! // Record some changes
//! history.create_directory("src").unwrap();
//! history.create_file("src/main.rs", b"fn main() {}", Some(10)).unwrap();
//! history.change_file_content("src/main.rs", b"fn main() { run() }", Some(20)).unwrap();
//!
//! // Ask for old content
//! let old = history.byte_content("src/main.rs", |t: i64| t < 15).unwrap();
//! assert_eq!(old.as_deref(), Some(&b"fn main() {}"[..]));
//! ```
//!
//! # Features
//!
//! ## Change Sets
//!
//! Changes recorded between `begin_change_set` and `end_change_set` form one
//! atomic, optionally named unit:
//!
//! ```
//! use lh_core::LocalHistory;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut history = LocalHistory::init(tmp.path()).unwrap();
//! history.create_file("a.txt", b"1", None).unwrap();
//!
//! history.begin_change_set().unwrap();
//! history.change_file_content("a.txt", b"2", None).unwrap();
//! history.rename("a.txt", "b.txt").unwrap();
//! history.end_change_set(Some("Refactor")).unwrap();
//!
//! let revisions = history.revisions_for("b.txt").unwrap();
//! assert_eq!(revisions.len(), 2);
//! assert_eq!(revisions[0].name(), Some("Refactor"));
//! ```
//!
//! ## Labels
//!
//! Labels mark a point in time, either for one subtree or for everything:
//!
//! ```
//! use lh_core::LocalHistory;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut history = LocalHistory::init(tmp.path()).unwrap();
//! history.create_file("a.txt", b"1", None).unwrap();
//! history.put_global_user_label("before upgrade").unwrap();
//!
//! let revisions = history.revisions_for("a.txt").unwrap();
//! assert!(revisions[0].is_label());
//! ```

mod change;
mod change_list;
mod config;
mod content_id;
mod content_store;
mod diff;
mod entry;
mod error;
mod history;
pub mod path;
mod purge;
mod recent;
mod revisions;
mod storage;
mod verify;
mod visitor;

pub use change::{
    Change, ChangeFileContent, CreateEntry, CreatedKind, Delete, LabelKind, LabelScope, Move,
    PutLabel, Rename,
};
pub use change_list::{ChangeList, ChangeSet, ChangeSetContext};
pub use config::{Config, PurgeConfig, StorageConfig, CONFIG_FILE};
pub use content_id::{Content, ContentId};
pub use content_store::ContentStore;
pub use diff::{differences, Difference, DifferenceKind};
pub use entry::{Entry, EntryId, EntryKind, IdPath, RootEntry};
pub use error::{HistoryError, Result};
pub use history::LocalHistory;
pub use purge::PurgeReport;
pub use recent::{RecentChange, MAX_RECENT_CHANGES};
pub use revisions::{Revision, RevisionCause, TimestampPredicate};
pub use storage::{FORMAT_VERSION, LH_DIR};
pub use verify::{VerifyConfig, VerifyReport};
pub use visitor::ChangeVisitor;

/// Time provider trait for testing.
///
/// Allows injecting controlled time into a history for testing timestamps
/// and retention. Only used when explicitly set via `with_time_provider()`.
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> i64;
}

impl<F> TimeProvider for F
where
    F: Fn() -> i64 + Send + Sync,
{
    fn now(&self) -> i64 {
        self()
    }
}
