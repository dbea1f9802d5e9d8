//! Content identification and the on-disk blob envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer id of a stored content blob.
///
/// Ids are allocated sequentially by the [`crate::ContentStore`] and never
/// reused, even after the blob is purged.
///
/// # Examples
///
/// ```
/// use lh_core::ContentId;
///
/// let id = ContentId::new(0x1ab);
/// assert_eq!(id.shard(), "ab");
/// assert_eq!(id.to_string(), "427");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentId(u64);

impl ContentId {
    /// Creates a ContentId from its raw value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Returns the shard directory name (low byte as two hex chars).
    ///
    /// Used for directory sharding in the content store:
    /// `.lh/contents/{shard}/{id}`
    pub fn shard(&self) -> String {
        hex::encode([(self.0 & 0xff) as u8])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// Reference from a file entry to its bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Content {
    /// Bytes were captured under this id.
    Stored(ContentId),
    /// Bytes exceeded the configured size cap and were never captured.
    Unavailable,
}

impl Content {
    /// Returns the content id if the bytes were captured.
    pub fn id(&self) -> Option<ContentId> {
        match self {
            Content::Stored(id) => Some(*id),
            Content::Unavailable => None,
        }
    }

    /// Returns true if the bytes were captured.
    pub fn is_available(&self) -> bool {
        matches!(self, Content::Stored(_))
    }
}

/// Envelope magic bytes.
pub(crate) const MAGIC: &[u8; 5] = b"LHC01";

/// Size of the envelope header (magic + length + BLAKE3 digest).
pub(crate) const HEADER_LEN: usize = 5 + 8 + 32;

/// Wraps a payload in the canonical envelope.
///
/// Format:
/// - Magic: "LHC01" (5 bytes)
/// - Length: u64 LE (8 bytes)
/// - Digest: BLAKE3 of the payload (32 bytes)
/// - Payload: variable bytes
pub(crate) fn seal(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(blake3::hash(payload).as_bytes());
    out.extend_from_slice(payload);
    out
}

/// Why an envelope could not be opened.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EnvelopeError {
    /// Structural problem (size, magic, length field).
    Malformed(String),
    /// Digest mismatch, carrying (expected, actual) as hex.
    Digest(String, String),
}

/// Validates an envelope and returns its payload.
pub(crate) fn open(sealed: &[u8]) -> std::result::Result<&[u8], EnvelopeError> {
    if sealed.len() < HEADER_LEN {
        return Err(EnvelopeError::Malformed("envelope too small".to_string()));
    }
    if &sealed[..5] != MAGIC {
        return Err(EnvelopeError::Malformed("invalid magic bytes".to_string()));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&sealed[5..13]);
    let len = u64::from_le_bytes(len_bytes) as usize;
    let payload = &sealed[HEADER_LEN..];
    if payload.len() != len {
        return Err(EnvelopeError::Malformed(format!(
            "length mismatch: header says {}, got {}",
            len,
            payload.len()
        )));
    }

    let expected = &sealed[13..HEADER_LEN];
    let actual = blake3::hash(payload);
    if expected != actual.as_bytes() {
        return Err(EnvelopeError::Digest(
            hex::encode(expected),
            actual.to_hex().to_string(),
        ));
    }

    Ok(payload)
}
