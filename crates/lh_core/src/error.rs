//! Error types for lh_core operations.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for local history operations.
///
/// Absence (no such entry, no suitable revision, purged content) is not an
/// error: those lookups return `Option`. Oversized content is not an error
/// either, it is recorded as [`crate::Content::Unavailable`].
#[derive(Error, Debug)]
pub enum HistoryError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error while encoding the persisted state.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error while decoding the persisted state.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// A content blob or the state file has an invalid envelope.
    #[error("corrupted data at {}: {}", path.display(), reason)]
    CorruptedContent {
        /// Path to the corrupted file
        path: PathBuf,
        /// Description of the corruption
        reason: String,
    },

    /// Checksum verification failed while reading a content blob.
    #[error("checksum mismatch for content {id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Content id that failed verification
        id: u64,
        /// Digest stored in the envelope
        expected: String,
        /// Digest computed from the payload
        actual: String,
    },

    /// A change referenced a path that does not exist in the tree.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// A change tried to create an entry over an existing one.
    #[error("entry already exists: {0}")]
    EntryAlreadyExists(String),

    /// A directory was required but a file was found.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A file was required but a directory was found.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// The path is malformed (empty segment, `.` or `..`).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A change was reverted without having been applied first.
    #[error("change was never applied: {0}")]
    NotApplied(String),

    /// `end_change_set` was called without a matching `begin_change_set`.
    #[error("no change set in progress")]
    ChangeSetNotStarted,

    /// The operation is not allowed while a change set is open.
    #[error("change set in progress (depth {depth})")]
    ChangeSetInProgress {
        /// Current nesting depth
        depth: u32,
    },

    /// The history facade was already closed.
    #[error("local history is closed")]
    Closed,

    /// No `.lh` directory exists at the given location.
    #[error("not a local history workspace: {}", .0.display())]
    NotInitialized(PathBuf),

    /// `init` was called on a workspace that already has history.
    #[error("local history already initialized at {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// The state file was written by an incompatible version.
    #[error("unsupported state format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version found on disk
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Workspace is locked by another process.
    #[error("local history locked by another process")]
    RepositoryLocked,

    /// Lock file is held by a live process.
    #[error("local history lock held by another process (PID: {pid})")]
    LockHeld {
        /// Process ID holding the lock
        pid: u32,
    },

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Replaying the persisted log against the base snapshot failed.
    #[error("replay failed at change set {change_set}: {reason}")]
    ReplayFailed {
        /// Id of the change set that could not be applied
        change_set: u64,
        /// Underlying failure
        reason: String,
    },
}

impl HistoryError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::CorruptedContent { .. } | Self::ChecksumMismatch { .. } => {
                Some("Run 'lh verify' to list damaged content, then 'lh purge' to drop old history.")
            }
            Self::ReplayFailed { .. } => {
                Some("The history log is inconsistent. Restore .lh/state from a backup or re-initialize.")
            }
            Self::LockHeld { .. } => {
                Some("Another process is using this workspace. Wait for it to finish.")
            }
            Self::RepositoryLocked => {
                Some("Wait for the other process to finish, or manually remove .lh/LOCK if the process is dead.")
            }
            Self::NotInitialized(_) => Some("Run 'lh init' first."),
            Self::ChangeSetInProgress { .. } => {
                Some("Finish the open change set with end_change_set before retrying.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for lh_core operations.
pub type Result<T> = std::result::Result<T, HistoryError>;
