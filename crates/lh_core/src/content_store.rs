//! Integer-addressed content blob storage.

use crate::config::StorageConfig;
use crate::content_id::{self, Content, ContentId, EnvelopeError};
use crate::error::{HistoryError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content blob storage.
///
/// New blobs get the next integer id and stay in memory until the owning
/// [`crate::LocalHistory`] is saved; saved blobs are zstd-compressed files
/// under `{root}/{shard}/{id}` and are read back lazily on demand.
///
/// # Examples
///
/// ```
/// use lh_core::{Content, ContentStore, StorageConfig};
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let mut store = ContentStore::new(tmp.path().join("contents"), 0, &StorageConfig::default());
///
/// let content = store.store(b"hello world");
/// let id = content.id().unwrap();
/// assert_eq!(store.get(id).unwrap().unwrap(), b"hello world");
/// ```
pub struct ContentStore {
    root: PathBuf,
    next_id: u64,
    max_content_size: usize,
    compression_level: i32,
    /// Blobs stored since the last save.
    pending: BTreeMap<ContentId, Vec<u8>>,
}

/// A blob written to its temporary location, waiting to be renamed in place.
#[derive(Debug)]
pub(crate) struct StagedBlob {
    id: ContentId,
    tmp_path: PathBuf,
    path: PathBuf,
}

impl ContentStore {
    /// Creates a content store rooted at the given directory.
    ///
    /// `next_id` is the first id to allocate; the persistence layer passes
    /// the counter it saved last time.
    pub fn new(root: impl AsRef<Path>, next_id: u64, config: &StorageConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            next_id,
            max_content_size: config.max_content_size,
            compression_level: config.compression_level,
            pending: BTreeMap::new(),
        }
    }

    /// Returns the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the id the next stored blob will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Returns the configured size cap in bytes.
    pub fn max_content_size(&self) -> usize {
        self.max_content_size
    }

    /// Returns true if blobs are waiting to be written.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Stores bytes and returns a reference to them.
    ///
    /// If `data` exceeds the size cap the bytes are dropped and
    /// [`Content::Unavailable`] is returned; nothing is allocated or written.
    ///
    /// # Examples
    ///
    /// ```
    /// use lh_core::{Content, ContentStore, StorageConfig};
    ///
    /// let config = StorageConfig { max_content_size: 4, ..StorageConfig::default() };
    /// let mut store = ContentStore::new("/tmp/unused", 0, &config);
    ///
    /// assert_eq!(store.store(b"too large"), Content::Unavailable);
    /// assert_eq!(store.next_id(), 0);
    /// ```
    pub fn store(&mut self, data: &[u8]) -> Content {
        if data.len() > self.max_content_size {
            debug!(
                size = data.len(),
                limit = self.max_content_size,
                "content exceeds size cap, recording as unavailable"
            );
            return Content::Unavailable;
        }

        let id = ContentId::new(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, data.to_vec());
        Content::Stored(id)
    }

    /// Retrieves bytes by id.
    ///
    /// Returns `Ok(None)` if the blob does not exist (never stored, or
    /// purged).
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` or `CorruptedContent` if the file on disk
    /// fails verification.
    pub fn get(&self, id: ContentId) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.pending.get(&id) {
            return Ok(Some(bytes.clone()));
        }

        let path = self.content_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let compressed = fs::read(&path)?;
        let sealed = zstd::decode_all(compressed.as_slice())
            .map_err(|e| HistoryError::Compression(e.to_string()))?;

        match content_id::open(&sealed) {
            Ok(payload) => Ok(Some(payload.to_vec())),
            Err(EnvelopeError::Malformed(reason)) => {
                Err(HistoryError::CorruptedContent { path, reason })
            }
            Err(EnvelopeError::Digest(expected, actual)) => Err(HistoryError::ChecksumMismatch {
                id: id.get(),
                expected,
                actual,
            }),
        }
    }

    /// Checks if a blob exists (pending or on disk).
    pub fn exists(&self, id: ContentId) -> bool {
        self.pending.contains_key(&id) || self.content_path(id).exists()
    }

    /// Removes a blob.
    ///
    /// Removing an absent id is not an error; returns whether anything was
    /// removed.
    pub fn remove(&mut self, id: ContentId) -> Result<bool> {
        if self.pending.remove(&id).is_some() {
            return Ok(true);
        }

        let path = self.content_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HistoryError::Io(e)),
        }
    }

    /// Lists all blobs written to disk with their on-disk size.
    pub fn list_all(&self) -> Result<Vec<(ContentId, u64)>> {
        let mut contents = Vec::new();

        if !self.root.exists() {
            return Ok(contents);
        }

        for shard_entry in fs::read_dir(&self.root)? {
            let shard_path = shard_entry?.path();
            if !shard_path.is_dir() {
                continue;
            }

            for blob_entry in fs::read_dir(&shard_path)? {
                let blob_path = blob_entry?.path();

                // Skip temp files
                if !blob_path.is_file() || blob_path.extension().is_some() {
                    continue;
                }

                let Some(raw) = blob_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.parse::<u64>().ok())
                else {
                    continue;
                };

                let size = fs::metadata(&blob_path)?.len();
                contents.push((ContentId::new(raw), size));
            }
        }

        contents.sort_by_key(|(id, _)| *id);
        Ok(contents)
    }

    /// Writes every pending blob to a temporary file next to its final path.
    ///
    /// Nothing is visible to readers until [`Self::commit_staged`] runs. On
    /// failure the temporary files written so far are removed.
    pub(crate) fn stage_pending(&self) -> Result<Vec<StagedBlob>> {
        let mut staged = Vec::with_capacity(self.pending.len());

        for (id, bytes) in &self.pending {
            match self.stage_one(*id, bytes) {
                Ok(blob) => staged.push(blob),
                Err(e) => {
                    discard_staged(staged);
                    return Err(e);
                }
            }
        }

        Ok(staged)
    }

    /// Moves staged blobs in place and clears the pending set.
    pub(crate) fn commit_staged(&mut self, staged: Vec<StagedBlob>) -> Result<()> {
        let mut dirs = Vec::new();
        for blob in staged {
            fs::rename(&blob.tmp_path, &blob.path)?;
            self.pending.remove(&blob.id);
            if let Some(dir) = blob.path.parent() {
                if !dirs.contains(&dir.to_path_buf()) {
                    dirs.push(dir.to_path_buf());
                }
            }
        }

        // fsync shard directories (Unix-specific for crash safety)
        #[cfg(unix)]
        for dir in dirs {
            if let Ok(dir_file) = File::open(&dir) {
                let _ = dir_file.sync_all();
            }
        }
        #[cfg(not(unix))]
        drop(dirs);

        Ok(())
    }

    /// Drops pending blobs and resets the id counter, used when the state is
    /// reloaded from disk.
    pub(crate) fn reset(&mut self, next_id: u64) {
        self.pending.clear();
        self.next_id = next_id;
    }

    /// Computes the filesystem path for a blob.
    pub(crate) fn content_path(&self, id: ContentId) -> PathBuf {
        self.root.join(id.shard()).join(id.to_string())
    }

    fn stage_one(&self, id: ContentId, bytes: &[u8]) -> Result<StagedBlob> {
        let path = self.content_path(id);
        let dir = path
            .parent()
            .ok_or_else(|| HistoryError::InvalidPath(path.display().to_string()))?;
        fs::create_dir_all(dir)?;

        let compressed = zstd::encode_all(content_id::seal(bytes).as_slice(), self.compression_level)
            .map_err(|e| HistoryError::Compression(e.to_string()))?;

        let tmp_path = path.with_extension("tmp");
        let mut file = File::create(&tmp_path)?;
        let written = file.write_all(&compressed).and_then(|_| file.sync_all());
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(HistoryError::Io(e));
        }

        Ok(StagedBlob { id, tmp_path, path })
    }
}

/// Removes the temporary files of blobs that will not be committed.
pub(crate) fn discard_staged(staged: Vec<StagedBlob>) {
    for blob in staged {
        let _ = fs::remove_file(&blob.tmp_path);
    }
}
