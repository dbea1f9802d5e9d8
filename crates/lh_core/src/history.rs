//! The local history handle.

use crate::change::{Change, LabelKind, LabelScope};
use crate::change_list::{ChangeList, ChangeSet, ChangeSetContext};
use crate::config::Config;
use crate::content_id::Content;
use crate::content_store::{self, ContentStore};
use crate::diff::{self, Difference};
use crate::entry::{Entry, EntryId, RootEntry};
use crate::error::{HistoryError, Result};
use crate::path;
use crate::purge::{self, PurgeReport};
use crate::recent::{self, RecentChange};
use crate::revisions::{self, Revision, TimestampPredicate};
use crate::storage::{PersistentStateRef, Storage, FORMAT_VERSION};
use crate::verify::{self, VerifyConfig, VerifyReport};
use crate::visitor::ChangeVisitor;
use crate::TimeProvider;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Local history of one workspace.
///
/// Records every change made through it, answers history queries, and
/// persists to the workspace's `.lh` directory on [`save`](Self::save).
/// Holds the workspace lock until [`close`](Self::close) or drop.
///
/// Mutations made at change set depth zero are committed immediately as
/// their own unnamed change set; between [`begin_change_set`] and the
/// matching [`end_change_set`] they are grouped into one.
///
/// [`begin_change_set`]: Self::begin_change_set
/// [`end_change_set`]: Self::end_change_set
pub struct LocalHistory {
    /// Workspace directory (parent of `.lh`).
    root: PathBuf,
    storage: Storage,
    config: Config,
    store: ContentStore,
    change_list: ChangeList,
    /// Base plus every committed change set plus pending changes.
    live: RootEntry,
    context: ChangeSetContext,
    next_entry_id: u64,
    next_change_set_id: u64,
    /// True if something changed since the last save.
    dirty: bool,
    closed: bool,
    /// Time provider for testing (None = use system time).
    time_provider: Option<Arc<dyn TimeProvider>>,
}

impl LocalHistory {
    /// Creates a new history in `path/.lh`.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if the workspace already has history.
    ///
    /// # Examples
    ///
    /// ```
    /// use lh_core::LocalHistory;
    /// use tempfile::TempDir;
    ///
    /// let tmp = TempDir::new().unwrap();
    /// let mut history = LocalHistory::init(tmp.path()).unwrap();
    /// history.create_file("notes.txt", b"hello", None).unwrap();
    /// assert!(history.has_entry("notes.txt"));
    /// history.save().unwrap();
    /// history.close().unwrap();
    /// ```
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let storage = Storage::init(&root)?;
        info!(root = %root.display(), "initialized local history");
        Self::load_from(root, storage)
    }

    /// Opens the history of an existing workspace.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if there is no history, `LockHeld` if another live
    /// process has it open, or any error reading and replaying the state.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let storage = Storage::open(&root)?;
        Self::load_from(root, storage)
    }

    fn load_from(root: PathBuf, storage: Storage) -> Result<Self> {
        let config = Config::load(storage.lh_dir())?;
        let state = storage.read_state()?;
        let mut change_list = state.change_list;
        let live = change_list.replay()?;
        let store = ContentStore::new(storage.contents_dir(), state.next_content_id, &config.storage);

        Ok(Self {
            root,
            storage,
            config,
            store,
            change_list,
            live,
            context: ChangeSetContext::new(),
            next_entry_id: state.next_entry_id,
            next_change_set_id: state.next_change_set_id,
            dirty: false,
            closed: false,
            time_provider: None,
        })
    }

    /// Sets a custom time provider for testing.
    ///
    /// Every mutation without an explicit timestamp, and
    /// [`purge_older_than`](Self::purge_older_than), read the clock through it.
    pub fn with_time_provider(mut self, provider: impl TimeProvider + 'static) -> Self {
        self.time_provider = Some(Arc::new(provider));
        self
    }

    /// Returns the workspace directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The committed change log.
    pub fn change_list(&self) -> &ChangeList {
        &self.change_list
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.store
    }

    /// True if there are changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current nesting depth of change sets.
    pub fn change_set_depth(&self) -> u32 {
        self.context.depth()
    }

    /// Current Unix time in seconds, from the time provider if set.
    pub fn now(&self) -> i64 {
        match &self.time_provider {
            Some(provider) => provider.now(),
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or_default(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(HistoryError::Closed);
        }
        Ok(())
    }

    // ---- mutations ----

    /// Records a new file. Returns its id.
    ///
    /// Content larger than `storage.max_content_size` is recorded as
    /// [`Content::Unavailable`]. `timestamp` defaults to now.
    pub fn create_file(&mut self, path: &str, content: &[u8], timestamp: Option<i64>) -> Result<EntryId> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let timestamp = timestamp.unwrap_or_else(|| self.now());
        let id = EntryId::new(self.next_entry_id);

        let content = self.store.store(content);
        if let Err(e) = self.apply(Change::create_file(id, path, content, timestamp)) {
            self.discard_content(content);
            return Err(e);
        }
        self.next_entry_id += 1;
        Ok(id)
    }

    /// Records a new directory. Returns its id.
    pub fn create_directory(&mut self, path: &str) -> Result<EntryId> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let id = EntryId::new(self.next_entry_id);
        let timestamp = self.now();

        self.apply(Change::create_directory(id, path, timestamp))?;
        self.next_entry_id += 1;
        Ok(id)
    }

    /// Records new content for an existing file. `timestamp` defaults to now.
    pub fn change_file_content(&mut self, path: &str, content: &[u8], timestamp: Option<i64>) -> Result<()> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let timestamp = timestamp.unwrap_or_else(|| self.now());

        let content = self.store.store(content);
        if let Err(e) = self.apply(Change::change_file_content(path, content, timestamp)) {
            self.discard_content(content);
            return Err(e);
        }
        Ok(())
    }

    /// Renames an entry within its directory.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<()> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let timestamp = self.now();
        self.apply(Change::rename(path, new_name, timestamp))
    }

    /// Moves an entry into another directory.
    pub fn move_entry(&mut self, path: &str, new_parent: &str) -> Result<()> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let new_parent = path::normalize(new_parent)?;
        let timestamp = self.now();
        self.apply(Change::move_to(path, new_parent, timestamp))
    }

    /// Deletes an entry and its subtree.
    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let timestamp = self.now();
        self.apply(Change::delete(path, timestamp))
    }

    /// Labels the entry at `path` and its subtree. The root path `""`
    /// labels everything, like [`put_global_user_label`](Self::put_global_user_label).
    pub fn put_user_label(&mut self, path: &str, name: &str) -> Result<()> {
        self.ensure_open()?;
        let path = path::normalize(path)?;
        let scope = if path.is_empty() {
            LabelScope::Global
        } else {
            LabelScope::Entry { path, id: None }
        };
        let timestamp = self.now();
        self.apply(Change::put_label(name, timestamp, scope, LabelKind::User))
    }

    /// Labels every entry existing now.
    pub fn put_global_user_label(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        let timestamp = self.now();
        self.apply(Change::put_label(name, timestamp, LabelScope::Global, LabelKind::User))
    }

    /// Places a global system label. `timestamp` defaults to now.
    pub fn put_system_label(&mut self, name: &str, timestamp: Option<i64>) -> Result<()> {
        self.ensure_open()?;
        let timestamp = timestamp.unwrap_or_else(|| self.now());
        self.apply(Change::put_label(name, timestamp, LabelScope::Global, LabelKind::System))
    }

    /// Opens a (possibly nested) change set.
    pub fn begin_change_set(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.context.begin();
        Ok(())
    }

    /// Closes a change set. The outermost call commits everything recorded
    /// since the matching begin as one change set named `name`; names given
    /// to inner calls are ignored. Nothing is committed if nothing was
    /// recorded.
    ///
    /// # Errors
    ///
    /// `ChangeSetNotStarted` if no change set is open.
    pub fn end_change_set(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_open()?;
        let changes = self.context.end()?;
        if !self.context.is_open() {
            self.commit(name.map(str::to_string), changes);
        }
        Ok(())
    }

    fn apply(&mut self, mut change: Change) -> Result<()> {
        change.apply_to(&mut self.live)?;
        if let Some(change) = self.context.record(change) {
            self.commit(None, vec![change]);
        }
        Ok(())
    }

    fn commit(&mut self, name: Option<String>, changes: Vec<Change>) {
        let Some(change_set) = ChangeSet::new(self.next_change_set_id, name, changes) else {
            return;
        };
        debug!(
            id = change_set.id(),
            changes = change_set.changes().len(),
            "committed change set"
        );
        self.next_change_set_id += 1;
        self.change_list.push(change_set);
        self.dirty = true;
    }

    fn discard_content(&mut self, content: Content) {
        if let Some(id) = content.id() {
            if let Err(e) = self.store.remove(id) {
                warn!(%id, error = %e, "failed to discard content of failed mutation");
            }
        }
    }

    /// Purges history strictly older than `horizon`.
    ///
    /// Idempotent. See [`PurgeReport`] for what was removed.
    pub fn purge_obsolete(&mut self, horizon: i64) -> Result<PurgeReport> {
        self.ensure_open()?;
        let report = purge::purge(&mut self.change_list, &mut self.store, horizon)?;
        if report.change_sets_removed > 0 {
            self.dirty = true;
        }
        Ok(report)
    }

    /// Purges history older than `age` before now. Ages beyond the clock's
    /// range purge nothing.
    pub fn purge_older_than(&mut self, age: Duration) -> Result<PurgeReport> {
        let age = i64::try_from(age.as_secs()).unwrap_or(i64::MAX);
        let horizon = self.now().saturating_sub(age);
        self.purge_obsolete(horizon)
    }

    /// Purges history older than the configured retention period.
    pub fn purge_with_config(&mut self) -> Result<PurgeReport> {
        let retention = self.config.purge.retention();
        self.purge_older_than(retention)
    }

    /// Number of content blobs a purge at `horizon` would delete.
    pub fn obsolete_content_count(&self, horizon: i64) -> Result<usize> {
        Ok(purge::obsolete_contents(&self.change_list, horizon)?.len())
    }

    // ---- queries ----

    /// Returns the entry at `path` in the live tree.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` if there is none.
    pub fn get_entry(&self, path: &str) -> Result<&Entry> {
        self.live.get_entry(path)
    }

    pub fn find_entry(&self, path: &str) -> Option<&Entry> {
        self.live.find_entry(path)
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.live.has_entry(path)
    }

    /// The live tree.
    pub fn root_entry(&self) -> &RootEntry {
        &self.live
    }

    /// The tree as of the newest committed change set, without changes
    /// buffered in an open change set.
    fn committed_root(&self) -> Result<Cow<'_, RootEntry>> {
        let pending = self.context.pending();
        if pending.is_empty() {
            return Ok(Cow::Borrowed(&self.live));
        }
        let mut root = self.live.clone();
        for change in pending.iter().rev() {
            change.revert_on(&mut root)?;
        }
        Ok(Cow::Owned(root))
    }

    /// History of the entry at `path`, newest first.
    ///
    /// Empty if nothing exists at `path`.
    pub fn revisions_for(&self, path: &str) -> Result<Vec<Revision>> {
        let root = self.committed_root()?;
        revisions::revisions_for(&self.change_list, &root, path)
    }

    /// Bytes of the newest revision of `path` whose timestamp satisfies
    /// `predicate`.
    ///
    /// `None` if no revision matches, the matching content was too large to
    /// capture, or it has been purged.
    pub fn byte_content<P: TimestampPredicate>(&self, path: &str, predicate: P) -> Result<Option<Vec<u8>>> {
        let revisions = self.revisions_for(path)?;
        match revisions.iter().find(|r| predicate.is_suitable(r.timestamp())) {
            Some(revision) => match revision.entry().content() {
                Some(content) => self.content_bytes(content),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Bytes behind a content reference.
    pub fn content_bytes(&self, content: Content) -> Result<Option<Vec<u8>>> {
        match content {
            Content::Stored(id) => self.store.get(id),
            Content::Unavailable => Ok(None),
        }
    }

    /// Up to 20 most recent named change sets, newest first.
    pub fn recent_changes(&self) -> Result<Vec<RecentChange>> {
        let root = self.committed_root()?;
        recent::recent_changes(&self.change_list, &root)
    }

    /// Walks the committed log newest to oldest.
    pub fn accept<V: ChangeVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        let root = self.committed_root()?;
        self.change_list.accept(&root, visitor)
    }

    /// Entry-level differences between two revisions.
    pub fn difference(&self, older: &Revision, newer: &Revision) -> Vec<Difference> {
        diff::differences(older.entry(), newer.entry())
    }

    /// Checks stored content and log consistency.
    pub fn verify(&self, config: &VerifyConfig) -> Result<VerifyReport> {
        let root = self.committed_root()?;
        verify::verify(&self.change_list, &root, &self.store, config)
    }

    // ---- persistence ----

    /// Writes unsaved changes to disk.
    ///
    /// Returns `false` without touching the disk if nothing changed since
    /// the last save. Otherwise pending content and the state record are
    /// staged to temporary files and then moved in place; if staging fails
    /// nothing becomes visible and the changes stay unsaved.
    pub fn save(&mut self) -> Result<bool> {
        self.ensure_open()?;
        if !self.dirty && !self.store.has_pending() {
            debug!("nothing to save");
            return Ok(false);
        }

        let state = PersistentStateRef {
            format_version: FORMAT_VERSION,
            next_entry_id: self.next_entry_id,
            next_change_set_id: self.next_change_set_id,
            next_content_id: self.store.next_id(),
            change_list: &self.change_list,
        };

        let staged = self.store.stage_pending()?;
        let tmp_state = match self
            .storage
            .stage_state(&state, self.config.storage.compression_level)
        {
            Ok(tmp) => tmp,
            Err(e) => {
                content_store::discard_staged(staged);
                return Err(e);
            }
        };

        if let Err(e) = self.store.commit_staged(staged) {
            self.storage.discard_state(tmp_state);
            return Err(e);
        }
        self.storage.commit_state(tmp_state)?;

        self.dirty = false;
        info!(change_sets = self.change_list.len(), "saved local history");
        Ok(true)
    }

    /// Reloads the saved state, dropping unsaved changes.
    ///
    /// # Errors
    ///
    /// `ChangeSetInProgress` while a change set is open.
    pub fn load(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.context.is_open() {
            return Err(HistoryError::ChangeSetInProgress {
                depth: self.context.depth(),
            });
        }

        let state = self.storage.read_state()?;
        let mut change_list = state.change_list;
        let live = change_list.replay()?;

        self.store.reset(state.next_content_id);
        self.change_list = change_list;
        self.live = live;
        self.next_entry_id = state.next_entry_id;
        self.next_change_set_id = state.next_change_set_id;
        self.dirty = false;
        Ok(())
    }

    /// Releases the workspace lock. Unsaved changes are dropped. Safe to
    /// call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.context.is_open() {
            let committed = self.committed_root()?.into_owned();
            self.live = committed;
        }
        self.context.reset();
        self.storage.release();
        self.closed = true;
        debug!(root = %self.root.display(), "closed local history");
        Ok(())
    }
}
