//! On-disk layout of a local history workspace.
//!
//! ```text
//! <workspace>/.lh/
//!   state            zstd(envelope(postcard(PersistentState)))
//!   contents/{shard}/{id}
//!   config.toml
//!   .gitignore
//!   LOCK             PID of the owning process while open
//! ```

use crate::change_list::ChangeList;
use crate::config::Config;
use crate::content_id;
use crate::content_id::EnvelopeError;
use crate::error::{HistoryError, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the history directory inside a workspace.
pub const LH_DIR: &str = ".lh";

/// Version of the state record layout.
pub const FORMAT_VERSION: u32 = 1;

const STATE_FILE: &str = "state";
const CONTENTS_DIR: &str = "contents";
const LOCK_FILE: &str = "LOCK";

/// Everything persisted besides content blobs.
#[derive(Debug, Deserialize)]
pub(crate) struct PersistentState {
    pub format_version: u32,
    pub next_entry_id: u64,
    pub next_change_set_id: u64,
    pub next_content_id: u64,
    pub change_list: ChangeList,
}

/// Borrowed form of [`PersistentState`] used when saving; same field order.
#[derive(Debug, Serialize)]
pub(crate) struct PersistentStateRef<'a> {
    pub format_version: u32,
    pub next_entry_id: u64,
    pub next_change_set_id: u64,
    pub next_content_id: u64,
    pub change_list: &'a ChangeList,
}

/// Handle on a `.lh` directory, holding its lock while alive.
pub(crate) struct Storage {
    lh_dir: PathBuf,
    lock: Option<LockGuard>,
}

impl Storage {
    /// Creates the `.lh` directory structure with an empty state and locks it.
    pub(crate) fn init(workspace: &Path) -> Result<Self> {
        let lh_dir = workspace.join(LH_DIR);
        if lh_dir.exists() {
            return Err(HistoryError::AlreadyInitialized(workspace.to_path_buf()));
        }

        fs::create_dir_all(lh_dir.join(CONTENTS_DIR))?;
        Config::default().save(&lh_dir)?;

        let gitignore = r#"# local history is per-machine
*
"#;
        fs::write(lh_dir.join(".gitignore"), gitignore)?;

        let mut storage = Self { lh_dir, lock: None };
        storage.lock = Some(acquire_lock(&storage.lock_path())?);

        let empty = ChangeList::new();
        let state = PersistentStateRef {
            format_version: FORMAT_VERSION,
            next_entry_id: 1,
            next_change_set_id: 1,
            next_content_id: 0,
            change_list: &empty,
        };
        let tmp = storage.stage_state(&state, Config::default().storage.compression_level)?;
        storage.commit_state(tmp)?;
        Ok(storage)
    }

    /// Opens and locks an existing `.lh` directory.
    pub(crate) fn open(workspace: &Path) -> Result<Self> {
        let lh_dir = workspace.join(LH_DIR);
        if !lh_dir.join(STATE_FILE).exists() {
            return Err(HistoryError::NotInitialized(workspace.to_path_buf()));
        }

        let mut storage = Self { lh_dir, lock: None };
        storage.lock = Some(acquire_lock(&storage.lock_path())?);
        Ok(storage)
    }

    pub(crate) fn lh_dir(&self) -> &Path {
        &self.lh_dir
    }

    pub(crate) fn contents_dir(&self) -> PathBuf {
        self.lh_dir.join(CONTENTS_DIR)
    }

    pub(crate) fn state_path(&self) -> PathBuf {
        self.lh_dir.join(STATE_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.lh_dir.join(LOCK_FILE)
    }

    /// Reads and decodes the state record.
    ///
    /// # Errors
    ///
    /// `CorruptedContent` if the envelope does not verify, `UnsupportedFormat`
    /// for a record written by another format version.
    pub(crate) fn read_state(&self) -> Result<PersistentState> {
        let path = self.state_path();
        let compressed = fs::read(&path)?;
        let sealed = zstd::decode_all(compressed.as_slice())
            .map_err(|e| HistoryError::Compression(e.to_string()))?;

        let payload = content_id::open(&sealed).map_err(|e| HistoryError::CorruptedContent {
            path: path.clone(),
            reason: match e {
                EnvelopeError::Malformed(reason) => reason,
                EnvelopeError::Digest(expected, actual) => {
                    format!("digest mismatch: expected {}, got {}", expected, actual)
                }
            },
        })?;

        let state: PersistentState = postcard::from_bytes(payload)
            .map_err(|e| HistoryError::Deserialization(e.to_string()))?;
        if state.format_version != FORMAT_VERSION {
            return Err(HistoryError::UnsupportedFormat {
                found: state.format_version,
                expected: FORMAT_VERSION,
            });
        }

        debug!(
            change_sets = state.change_list.len(),
            next_entry_id = state.next_entry_id,
            "read history state"
        );
        Ok(state)
    }

    /// Encodes the state into a temporary file next to the state file.
    pub(crate) fn stage_state(&self, state: &PersistentStateRef<'_>, level: i32) -> Result<PathBuf> {
        let bytes =
            postcard::to_allocvec(state).map_err(|e| HistoryError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(content_id::seal(&bytes).as_slice(), level)
            .map_err(|e| HistoryError::Compression(e.to_string()))?;

        let tmp_path = self.state_path().with_extension("tmp");
        let written = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&compressed)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(HistoryError::Io(e));
        }
        Ok(tmp_path)
    }

    /// Moves a staged state file in place.
    pub(crate) fn commit_state(&self, tmp_path: PathBuf) -> Result<()> {
        if let Err(e) = fs::rename(&tmp_path, self.state_path()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(HistoryError::Io(e));
        }

        // fsync directory (Unix-specific for crash safety)
        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(&self.lh_dir) {
                let _ = dir_file.sync_all();
            }
        }
        Ok(())
    }

    /// Removes a staged state file that will not be committed.
    pub(crate) fn discard_state(&self, tmp_path: PathBuf) {
        let _ = fs::remove_file(tmp_path);
    }

    /// Releases the lock. Safe to call more than once.
    pub(crate) fn release(&mut self) {
        self.lock.take();
    }
}

/// Acquires the exclusive workspace lock.
///
/// The lock file contains the PID of the owning process. A lock left by a
/// dead process is removed and taken over.
fn acquire_lock(lock_path: &Path) -> Result<LockGuard> {
    acquire_lock_with_retry(lock_path, 0)
}

fn acquire_lock_with_retry(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    if retry_count > 2 {
        return Err(HistoryError::RepositoryLocked);
    }

    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
    {
        Ok(file) => claim_lock(file, lock_path),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            handle_existing_lock(lock_path, retry_count)
        }
        Err(e) => Err(HistoryError::Io(e)),
    }
}

/// Writes our PID into a freshly created lock file and locks it. On
/// failure the file is removed so it cannot be mistaken for a live lock.
fn claim_lock(file: File, lock_path: &Path) -> Result<LockGuard> {
    let mut guard = LockGuard {
        file: Some(file),
        path: lock_path.to_path_buf(),
    };
    if let Some(file) = guard.file.as_mut() {
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        file.try_lock_exclusive()
            .map_err(|_| HistoryError::RepositoryLocked)?;
    }
    Ok(guard)
}

fn handle_existing_lock(lock_path: &Path, retry_count: u32) -> Result<LockGuard> {
    match fs::read_to_string(lock_path) {
        Ok(content) => {
            if let Ok(pid) = content.trim().parse::<u32>() {
                if is_process_alive(pid) {
                    return Err(HistoryError::LockHeld { pid });
                }

                warn!(pid = pid, "Detected stale lock from dead process, cleaning up");
                if let Err(e) = fs::remove_file(lock_path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(HistoryError::Io(e));
                    }
                }
                return acquire_lock_with_retry(lock_path, retry_count + 1);
            }

            warn!("Lock file has invalid content, attempting cleanup");
            let _ = fs::remove_file(lock_path);
            acquire_lock_with_retry(lock_path, retry_count + 1)
        }
        // Removed between the create attempt and the read.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            acquire_lock_with_retry(lock_path, retry_count + 1)
        }
        Err(_) => Err(HistoryError::RepositoryLocked),
    }
}

/// RAII guard for the workspace lock.
///
/// Dropping it closes the file (releasing the `fs2` lock) and removes the
/// lock file.
struct LockGuard {
    file: Option<File>,
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
        }
        let _ = fs::remove_file(&self.path);
    }
}

/// Check if a process with the given PID is still alive.
///
/// Non-Unix systems conservatively report every process as alive, so stale
/// locks there must be removed by hand.
#[cfg(target_os = "linux")]
fn is_process_alive(pid: u32) -> bool {
    // Zombies keep a /proc entry, but not a readable stat file.
    Path::new(&format!("/proc/{}/stat", pid)).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
