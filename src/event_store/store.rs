//! Keyed Log - the append-only item stream every broker is built on
//!
//! A `KeyedLog` owns an ordered run of [`Item`]s, assigns sequence numbers,
//! answers filtered and paginated reads, fans appends out to subscribers and
//! persists itself through a [`SnapshotStore`].
//!
//! All state lives behind one mutex. Appends take it, store the item and
//! notify subscribers before releasing it, so delivery order always matches
//! sequence order and a watcher registering with replay can never miss or
//! double-see an item.

use std::collections::{HashMap, HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, info, warn};

use super::keyed::Keyed;
use super::snapshot::{JsonFileStore, SnapshotStore, StoreError};
use super::subscribers::{Callback, Scope, SubscriberIndex, Subscription};
use crate::types::{Item, Page, PageParams};

/// Construction parameters for a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Stream name used in log lines
    pub name: String,
    /// Snapshot file; `None` keeps the stream in memory only
    pub path: Option<PathBuf>,
    /// Trailing window applied when saving; `None` or 0 keeps everything
    pub max_items: Option<usize>,
    /// In-memory bound; the oldest items are dropped beyond it
    pub capacity: Option<usize>,
}

impl LogConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            max_items: None,
            capacity: None,
        }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// The JSON file store described by this config
    pub fn file_store(&self) -> JsonFileStore {
        JsonFileStore::new(self.name.clone(), self.path.clone(), self.max_items)
    }
}

/// Running summary of the items stored under one key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStatus {
    /// Items currently stored under the key
    pub count: usize,
    /// How many of those are terminal (see [`Keyed::is_terminal`])
    pub terminal_count: usize,
    /// Highest sequence number stored under the key
    pub last_sequence: u64,
}

impl KeyStatus {
    pub fn is_complete(&self) -> bool {
        self.terminal_count > 0
    }
}

/// What to hand a new subscriber before live delivery starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Live items only
    Nothing,
    /// Every stored item in scope
    FromBeginning,
    /// Stored items in scope with `sequence_number > cursor`
    After(u64),
}

struct LogState<T> {
    items: VecDeque<Item<T>>,
    next_sequence: u64,
    keys: HashMap<String, KeyStatus>,
}

impl<T: Keyed> LogState<T> {
    fn new(items: Vec<Item<T>>, next_sequence: u64) -> Self {
        let mut state = Self {
            items: items.into(),
            next_sequence,
            keys: HashMap::new(),
        };
        state.rebuild_keys();
        state
    }

    fn push(&mut self, item: Item<T>) {
        if let Some(key) = item.data.key() {
            let status = self.keys.entry(key.to_string()).or_default();
            status.count += 1;
            if item.data.is_terminal() {
                status.terminal_count += 1;
            }
            status.last_sequence = item.sequence_number;
        }
        self.items.push_back(item);
    }

    /// Drop the oldest items until at most `capacity` remain
    fn enforce_capacity(&mut self, capacity: usize) -> usize {
        let mut dropped = 0;
        while self.items.len() > capacity {
            let Some(oldest) = self.items.pop_front() else {
                break;
            };
            dropped += 1;
            let Some(key) = oldest.data.key() else {
                continue;
            };
            if let Some(status) = self.keys.get_mut(key) {
                status.count -= 1;
                if oldest.data.is_terminal() {
                    status.terminal_count -= 1;
                }
                if status.count == 0 {
                    self.keys.remove(key);
                }
            }
        }
        dropped
    }

    fn rebuild_keys(&mut self) {
        self.keys.clear();
        for item in &self.items {
            if let Some(key) = item.data.key() {
                let status = self.keys.entry(key.to_string()).or_default();
                status.count += 1;
                if item.data.is_terminal() {
                    status.terminal_count += 1;
                }
                status.last_sequence = item.sequence_number;
            }
        }
    }
}

fn in_scope<T: Keyed>(scope: &Scope, item: &Item<T>) -> bool {
    match scope {
        Scope::All => true,
        Scope::Key(key) => item.data.key() == Some(key.as_str()),
    }
}

/// Append-only, sequenced, subscribable stream of `T`
pub struct KeyedLog<T> {
    name: String,
    capacity: Option<usize>,
    state: Mutex<LogState<T>>,
    subscribers: Arc<Mutex<SubscriberIndex<T>>>,
    store: Box<dyn SnapshotStore<T>>,
}

impl<T> KeyedLog<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Open a log backed by the JSON file described in `config`
    pub fn open(config: LogConfig) -> Self {
        let store = config.file_store();
        Self::with_store(config.name, config.capacity, Box::new(store))
    }

    /// A log that is never persisted
    pub fn in_memory(name: impl Into<String>) -> Self {
        let name = name.into();
        let store = JsonFileStore::in_memory(name.clone());
        Self::with_store(name, None, Box::new(store))
    }

    /// Create a log over any snapshot store, hydrating from it once.
    ///
    /// Unusable persisted state is logged and the log starts empty.
    pub fn with_store(
        name: impl Into<String>,
        capacity: Option<usize>,
        store: Box<dyn SnapshotStore<T>>,
    ) -> Self {
        let name = name.into();
        let capacity = capacity.filter(|cap| *cap > 0);

        let mut state = match store.load() {
            Ok(Some(snapshot)) => LogState::new(snapshot.items, snapshot.next_sequence),
            Ok(None) => LogState::new(Vec::new(), 1),
            Err(e) => {
                warn!(stream = %name, error = %e, "failed to load persisted state, starting empty");
                LogState::new(Vec::new(), 1)
            }
        };

        if let Some(cap) = capacity {
            let dropped = state.enforce_capacity(cap);
            if dropped > 0 {
                info!(stream = %name, dropped, capacity = cap, "dropped loaded items over capacity");
            }
        }

        Self {
            name,
            capacity,
            state: Mutex::new(state),
            subscribers: Arc::new(Mutex::new(SubscriberIndex::default())),
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `save()` reaches durable storage
    pub fn is_persistent(&self) -> bool {
        self.store.enabled()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Store `data` as the next item and deliver it to subscribers
    pub fn append(&self, data: T) -> Item<T> {
        let mut state = self.state.lock();
        self.append_locked(&mut state, data)
    }

    /// Append several payloads as one uninterrupted run
    pub fn append_all(&self, batch: impl IntoIterator<Item = T>) -> Vec<Item<T>> {
        let mut state = self.state.lock();
        batch
            .into_iter()
            .map(|data| self.append_locked(&mut state, data))
            .collect()
    }

    fn append_locked(&self, state: &mut LogState<T>, data: T) -> Item<T> {
        let item = Item::new(state.next_sequence, data);
        state.next_sequence += 1;
        state.push(item.clone());

        if let Some(cap) = self.capacity {
            state.enforce_capacity(cap);
        }

        self.dispatch(&item);
        item
    }

    fn dispatch(&self, item: &Item<T>) {
        // Clone the targets so a callback may drop its own subscription
        let targets = self.subscribers.lock().targets(item.data.key());
        for callback in targets {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(item)));
            if outcome.is_err() {
                error!(
                    stream = %self.name,
                    sequence = item.sequence_number,
                    "subscriber panicked during delivery"
                );
            }
        }
    }

    /// Remove every item matching `predicate`, then persist.
    ///
    /// Survivors keep their sequence numbers and the counter is untouched.
    /// Returns how many items were removed.
    pub fn delete_where(&self, predicate: impl Fn(&Item<T>) -> bool) -> usize {
        let mut state = self.state.lock();
        let before = state.items.len();
        state.items.retain(|item| !predicate(item));
        let removed = before - state.items.len();
        if removed > 0 {
            state.rebuild_keys();
        }
        self.save_locked(&mut state);
        removed
    }

    /// Remove everything and restart numbering at 1, then persist
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let removed = state.items.len();
        state.items.clear();
        state.keys.clear();
        state.next_sequence = 1;
        self.save_locked(&mut state);
        removed
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every stored item in stream order
    pub fn all(&self) -> Vec<Item<T>> {
        self.state.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Items matching `predicate`, in stream order
    pub fn filter(&self, predicate: impl Fn(&Item<T>) -> bool) -> Vec<Item<T>> {
        self.state
            .lock()
            .items
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// Items stored under `key`, in stream order
    pub fn by_key(&self, key: &str) -> Vec<Item<T>> {
        let state = self.state.lock();
        if !state.keys.contains_key(key) {
            return Vec::new();
        }
        state
            .items
            .iter()
            .filter(|item| item.data.key() == Some(key))
            .cloned()
            .collect()
    }

    /// Distinct keys of the stored items, in first-seen order
    pub fn keys(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut seen = HashSet::with_capacity(state.keys.len());
        state
            .items
            .iter()
            .filter_map(|item| item.data.key())
            .filter(|key| seen.insert(*key))
            .map(str::to_string)
            .collect()
    }

    pub fn key_status(&self, key: &str) -> Option<KeyStatus> {
        self.state.lock().keys.get(key).copied()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.state.lock().keys.contains_key(key)
    }

    /// Number of distinct keys currently stored
    pub fn key_count(&self) -> usize {
        self.state.lock().keys.len()
    }

    /// Last sequence number handed out (0 if none)
    pub fn current_sequence(&self) -> u64 {
        self.state.lock().next_sequence - 1
    }

    /// One page of the whole stream
    pub fn paginate(&self, params: PageParams) -> Page<Item<T>> {
        self.paginate_filtered(params, |_| true)
    }

    /// One page of the items matching `predicate`.
    ///
    /// `total` counts every match regardless of the cursor; `next_cursor` is
    /// set only when more matches exist after this page.
    pub fn paginate_filtered(
        &self,
        params: PageParams,
        predicate: impl Fn(&Item<T>) -> bool,
    ) -> Page<Item<T>> {
        let state = self.state.lock();

        let mut total = 0;
        let mut remaining = 0;
        let mut items = Vec::with_capacity(params.limit.min(state.items.len()));
        for item in state.items.iter().filter(|item| predicate(item)) {
            total += 1;
            if params.cursor.is_some_and(|cursor| item.sequence_number <= cursor) {
                continue;
            }
            remaining += 1;
            if items.len() < params.limit {
                items.push(item.clone());
            }
        }

        let has_more = remaining > params.limit;
        let next_cursor = if has_more {
            items.last().map(|item| item.sequence_number)
        } else {
            None
        };

        Page {
            items,
            total,
            has_more,
            next_cursor,
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Receive every future item in `scope`
    pub fn subscribe(
        &self,
        scope: Scope,
        callback: impl Fn(&Item<T>) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let callback: Callback<T> = Arc::new(callback);
        let id = self.subscribers.lock().insert(&scope, callback);
        Subscription::new(&self.subscribers, scope, id)
    }

    /// Collect stored items per `replay` and subscribe for future ones as a
    /// single step with respect to appends
    pub fn subscribe_with_replay(
        &self,
        scope: Scope,
        replay: Replay,
        callback: impl Fn(&Item<T>) + Send + Sync + 'static,
    ) -> (Vec<Item<T>>, Subscription<T>) {
        let state = self.state.lock();

        let after = match replay {
            Replay::Nothing => None,
            Replay::FromBeginning => Some(0),
            Replay::After(cursor) => Some(cursor),
        };
        let backlog = match after {
            Some(after) => state
                .items
                .iter()
                .filter(|item| item.sequence_number > after && in_scope(&scope, item))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        let subscription = self.subscribe(scope, callback);

        drop(state);
        (backlog, subscription)
    }

    /// Live subscriber registrations, across all scopes
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persist the stream; failures are logged and swallowed
    pub fn save(&self) {
        let mut state = self.state.lock();
        self.save_locked(&mut state);
    }

    /// Persist the stream, returning how many items were written
    pub fn try_save(&self) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let next_sequence = state.next_sequence;
        self.store.save(state.items.make_contiguous(), next_sequence)
    }

    fn save_locked(&self, state: &mut LogState<T>) {
        let next_sequence = state.next_sequence;
        if let Err(e) = self.store.save(state.items.make_contiguous(), next_sequence) {
            error!(stream = %self.name, error = %e, "failed to save");
        }
    }
}
