#![warn(missing_docs)]
//! # snaplabel-history
//!
//! ## Purpose
//! Persists the newest-first history of recognized (word, image) pairs.
//!
//! ## Responsibilities
//! - Define the key-value medium contract ([`KeyValueStore`]) with memory and
//!   file-backed implementations.
//! - Encode the whole history log as one JSON blob under [`HISTORY_KEY`].
//! - Read the full log, prepend one entry, and rewrite it.
//!
//! ## Data flow
//! Coordinator success -> [`HistoryStore::append`] -> `get(HISTORY_KEY)` ->
//! decode -> prepend -> encode -> `set(HISTORY_KEY)`.
//!
//! ## Concurrency
//! `append` is a read-modify-write without locking across the two medium
//! calls. Callers must guarantee a single writer; the capture coordinator
//! does so by running one capture at a time.
//!
//! ## Error model
//! Medium failures and undecodable blobs return [`StorageError`]. A missing
//! log is not an error; it reads as empty.

mod medium;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use medium::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

/// Well-known key holding the whole history log.
pub const HISTORY_KEY: &str = "wordsKeys";

/// One recognized word with the photo it was recognized from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Recognized label text.
    pub word: String,
    /// JPEG bytes of the photo.
    #[serde(with = "base64_bytes")]
    pub image: Vec<u8>,
    /// Wall-clock time of the recognition in Unix epoch milliseconds.
    pub recorded_at_ms: u64,
}

/// Newest-first history log backed by a key-value medium.
#[derive(Clone)]
pub struct HistoryStore {
    medium: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    /// Creates a store over `medium`.
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self { medium }
    }

    /// Prepends an entry stamped with the current time.
    ///
    /// Precondition: no other writer is appending concurrently.
    ///
    /// # Errors
    /// See [`HistoryStore::append_at`].
    pub fn append(&self, word: &str, image: Vec<u8>) -> Result<HistoryEntry, StorageError> {
        self.append_at(word, image, unix_timestamp_millis())
    }

    /// Prepends an entry with an explicit timestamp and rewrites the log.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidEntry`] for a blank word, and
    /// read/write/corrupt errors from the medium. On error the stored log is
    /// left as it was before the call, unless the medium itself failed
    /// mid-write.
    pub fn append_at(
        &self,
        word: &str,
        image: Vec<u8>,
        recorded_at_ms: u64,
    ) -> Result<HistoryEntry, StorageError> {
        if word.trim().is_empty() {
            return Err(StorageError::InvalidEntry("word is empty".to_string()));
        }

        let entry = HistoryEntry {
            word: word.to_string(),
            image,
            recorded_at_ms,
        };

        let mut entries = self.read_all()?;
        entries.insert(0, entry.clone());

        let blob = serde_json::to_vec(&entries)
            .map_err(|error| StorageError::Write(format!("history encode failed: {error}")))?;
        self.medium.set(HISTORY_KEY, &blob)?;

        info!(
            stage = "history",
            action = "append",
            entries = entries.len(),
            image_bytes = entry.image.len(),
        );

        Ok(entry)
    }

    /// Returns all entries newest-first, or an empty list when no log exists.
    ///
    /// # Errors
    /// Returns [`StorageError::Read`] when the medium is unreadable and
    /// [`StorageError::Corrupt`] when the stored blob cannot be decoded.
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        match self.medium.get(HISTORY_KEY)? {
            None => Ok(Vec::new()),
            Some(blob) => serde_json::from_slice(&blob)
                .map_err(|error| StorageError::Corrupt(error.to_string())),
        }
    }

    /// Returns the number of stored entries.
    ///
    /// # Errors
    /// Same as [`HistoryStore::read_all`].
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read_all()?.len())
    }

    /// Returns `true` when no entries are stored.
    ///
    /// # Errors
    /// Same as [`HistoryStore::read_all`].
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

fn unix_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

mod base64_bytes {
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// History persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Medium could not be read.
    #[error("history read failed: {0}")]
    Read(String),
    /// Medium could not be written.
    #[error("history write failed: {0}")]
    Write(String),
    /// Stored blob is not a valid history log.
    #[error("history log is corrupt: {0}")]
    Corrupt(String),
    /// Entry violates history invariants.
    #[error("invalid history entry: {0}")]
    InvalidEntry(String),
    /// Key cannot be mapped onto the medium.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for blob encoding.

    use super::*;

    #[test]
    fn image_bytes_are_stored_as_base64() {
        let medium = Arc::new(MemoryKeyValueStore::new());
        let store = HistoryStore::new(medium.clone());
        store
            .append_at("cup", vec![0xFF, 0xD8, 0x00], 7)
            .expect("append should succeed");

        let blob = medium
            .get(HISTORY_KEY)
            .expect("medium readable")
            .expect("log present");
        let json: serde_json::Value = serde_json::from_slice(&blob).expect("blob is json");
        assert_eq!(json[0]["word"], "cup");
        assert_eq!(json[0]["image"], "/9gA");
        assert_eq!(json[0]["recorded_at_ms"], 7);
    }

    #[test]
    fn corrupt_blob_is_reported() {
        let medium = Arc::new(MemoryKeyValueStore::new());
        medium.set(HISTORY_KEY, b"not json").expect("set");
        let store = HistoryStore::new(medium);
        assert!(matches!(store.read_all(), Err(StorageError::Corrupt(_))));
        assert!(matches!(
            store.append("cup", vec![1]),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn blank_word_is_rejected() {
        let store = HistoryStore::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(matches!(
            store.append("   ", vec![1]),
            Err(StorageError::InvalidEntry(_))
        ));
    }
}
