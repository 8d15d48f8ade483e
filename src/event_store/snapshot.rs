//! Bounded JSON file persistence for streams
//!
//! A snapshot is the whole stream written as one pretty-printed document:
//!
//! ```text
//! {
//!   "items": [ { "sequenceNumber": 1, "timestamp": "...", "data": { ... } }, ... ],
//!   "nextSequence": 42
//! }
//! ```
//!
//! The file is overwritten in a single write. There is no temp file and
//! rename, so a crash mid-write can leave a truncated document; the next
//! load reports it as corrupt and the stream starts empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::migration;
use crate::types::Item;

/// Highest sequence number accepted from disk (the largest integer JSON
/// producers can represent exactly)
pub const MAX_SEQUENCE: u64 = (1 << 53) - 1;

/// Items plus the counter the next append continues from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<T> {
    pub items: Vec<Item<T>>,
    pub next_sequence: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a, T> {
    items: &'a [Item<T>],
    next_sequence: u64,
}

/// Persisted state that exists but cannot be used
#[derive(Debug, Error)]
pub enum CorruptState {
    #[error("failed to read {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("invalid JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid data format in {}: {reason}", path.display())]
    InvalidShape { path: PathBuf, reason: String },
}

/// Errors that can occur while writing a snapshot
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence backend for a stream
pub trait SnapshotStore<T>: Send + Sync {
    /// Read the last snapshot.
    ///
    /// `Ok(None)` means there is nothing to load (persistence disabled or no
    /// file yet); `Err` means a file exists but is unusable.
    fn load(&self) -> Result<Option<Snapshot<T>>, CorruptState>;

    /// Write the stream, returning how many items were persisted
    fn save(&self, items: &[Item<T>], next_sequence: u64) -> Result<usize, StoreError>;

    /// Whether saves reach durable storage
    fn enabled(&self) -> bool;
}

/// Snapshot store backed by a single JSON file with a trailing-window limit
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    name: String,
    path: Option<PathBuf>,
    max_items: Option<usize>,
}

impl JsonFileStore {
    /// Create a store; `path = None` disables persistence, `max_items` of
    /// `None` or `Some(0)` disables trimming
    pub fn new(name: impl Into<String>, path: Option<PathBuf>, max_items: Option<usize>) -> Self {
        let name = name.into();
        if let Some(ref path) = path {
            info!(stream = %name, path = %path.display(), "persistence enabled");
        }
        Self {
            name,
            path,
            max_items: max_items.filter(|max| *max > 0),
        }
    }

    /// A store that never touches disk
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(name, None, None)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn max_items(&self) -> Option<usize> {
        self.max_items
    }

    /// Keep only the newest `max_items` items, in stream order
    fn apply_limit<'a, T>(&self, items: &'a [Item<T>]) -> &'a [Item<T>] {
        match self.max_items {
            Some(max) if items.len() > max => {
                let removed = items.len() - max;
                info!(stream = %self.name, removed, limit = max, "trimmed items");
                &items[removed..]
            }
            _ => items,
        }
    }
}

impl<T> SnapshotStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn load(&self) -> Result<Option<Snapshot<T>>, CorruptState> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };

        if !path.exists() {
            info!(stream = %self.name, "no existing data");
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| CorruptState::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| CorruptState::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        let snapshot = parse_snapshot(path, value)?;
        info!(stream = %self.name, records = snapshot.items.len(), "loaded records");
        Ok(Some(snapshot))
    }

    fn save(&self, items: &[Item<T>], next_sequence: u64) -> Result<usize, StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(0);
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let limited = self.apply_limit(items);
        let json = serde_json::to_string_pretty(&SnapshotRef {
            items: limited,
            next_sequence,
        })?;
        fs::write(path, json)?;

        debug!(stream = %self.name, records = limited.len(), "saved records");
        Ok(limited.len())
    }

    fn enabled(&self) -> bool {
        self.path.is_some()
    }
}

/// Validate the `{items, nextSequence}` envelope (or the legacy event-list
/// envelope) and decode the items
fn parse_snapshot<T: DeserializeOwned>(path: &Path, value: Value) -> Result<Snapshot<T>, CorruptState> {
    let invalid = |reason: &str| CorruptState::InvalidShape {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let malformed = |source| CorruptState::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let Value::Object(mut root) = value else {
        return Err(invalid("top level is not an object"));
    };

    if let Some(items) = root.remove("items") {
        if !items.is_array() {
            return Err(invalid("items is not an array"));
        }
        let next_sequence = root
            .get("nextSequence")
            .and_then(Value::as_u64)
            .ok_or_else(|| invalid("nextSequence is not a number"))?;
        if next_sequence > MAX_SEQUENCE {
            return Err(invalid("nextSequence is out of range"));
        }
        let items: Vec<Item<T>> = serde_json::from_value(items).map_err(malformed)?;
        if items.iter().any(|item| item.sequence_number > MAX_SEQUENCE) {
            return Err(invalid("sequenceNumber is out of range"));
        }

        // Never hand out a number that is already on disk
        let floor = match items.last() {
            Some(last) => last
                .sequence_number
                .checked_add(1)
                .ok_or_else(|| invalid("sequenceNumber is out of range"))?,
            None => 1,
        };
        return Ok(Snapshot {
            items,
            next_sequence: next_sequence.max(floor),
        });
    }

    if let Some(events) = root.remove("events") {
        return migration::from_event_list(events).map_err(|err| match err {
            migration::LegacyError::NotAnArray => invalid("events is not an array"),
            migration::LegacyError::Payload(source) => malformed(source),
        });
    }

    Err(invalid("missing items array"))
}
