//! Broker item - one sequenced record in a stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::{iso_millis, now_millis};

/// A payload wrapped with its stream position and arrival time.
///
/// Sequence numbers are unique and strictly increasing within a stream but
/// are not dense: compaction and trimming leave gaps, so treat them as
/// opaque cursors rather than indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item<T> {
    pub sequence_number: u64,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub data: T,
}

impl<T> Item<T> {
    /// Wrap `data` at `sequence_number`, timestamped now
    pub fn new(sequence_number: u64, data: T) -> Self {
        Self {
            sequence_number,
            timestamp: now_millis(),
            data,
        }
    }
}
