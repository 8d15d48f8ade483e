//! Key extraction for stream payloads

/// A payload that can be grouped by a string key.
///
/// Messages are keyed by conversation, chunks and events by query, spans by
/// trace. A payload with no key is still stored and delivered to global
/// subscribers, it just never appears under any key.
pub trait Keyed {
    fn key(&self) -> Option<&str>;

    /// Whether this payload closes its key's sequence (e.g. the `[DONE]` chunk)
    fn is_terminal(&self) -> bool {
        false
    }
}

impl Keyed for serde_json::Value {
    fn key(&self) -> Option<&str> {
        None
    }
}
