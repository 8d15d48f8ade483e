//! Migration of the legacy event file format
//!
//! The previous event store wrote `{"events": [ ... ]}`: bare payloads with no
//! sequence numbers or arrival times. Such files are read into the unified
//! snapshot shape, numbering items 1..n in file order and stamping them with
//! the load time. The next save rewrites the file in the current envelope.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use super::snapshot::Snapshot;
use crate::types::Item;

#[derive(Debug)]
pub(crate) enum LegacyError {
    NotAnArray,
    Payload(serde_json::Error),
}

/// Convert the value of a legacy `events` field into a snapshot
pub(crate) fn from_event_list<T: DeserializeOwned>(events: Value) -> Result<Snapshot<T>, LegacyError> {
    let Value::Array(raw) = events else {
        return Err(LegacyError::NotAnArray);
    };

    let items = raw
        .into_iter()
        .zip(1u64..)
        .map(|(payload, seq)| {
            serde_json::from_value(payload)
                .map(|data| Item::new(seq, data))
                .map_err(LegacyError::Payload)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let next_sequence = items.len() as u64 + 1;
    info!(records = items.len(), "migrated legacy event list");

    Ok(Snapshot {
        items,
        next_sequence,
    })
}
