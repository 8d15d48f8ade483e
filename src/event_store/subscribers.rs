//! Subscriber registry for live delivery
//!
//! Callbacks are indexed by key so an append only touches the subscribers for
//! its own key plus the global ones. A [`Subscription`] handle removes its
//! callback exactly once, on `unsubscribe()` or on drop.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::types::Item;

/// Callback invoked for each delivered item
pub type Callback<T> = Arc<dyn Fn(&Item<T>) + Send + Sync>;

/// Which items a subscriber receives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Every item appended to the stream
    All,
    /// Only items whose payload key equals this value
    Key(String),
}

impl Scope {
    pub fn key(key: impl Into<String>) -> Self {
        Scope::Key(key.into())
    }
}

pub(crate) struct SubscriberIndex<T> {
    next_id: u64,
    by_key: HashMap<String, Vec<(u64, Callback<T>)>>,
    all: Vec<(u64, Callback<T>)>,
}

impl<T> Default for SubscriberIndex<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            by_key: HashMap::new(),
            all: Vec::new(),
        }
    }
}

impl<T> SubscriberIndex<T> {
    pub(crate) fn insert(&mut self, scope: &Scope, callback: Callback<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        match scope {
            Scope::All => self.all.push((id, callback)),
            Scope::Key(key) => self.by_key.entry(key.clone()).or_default().push((id, callback)),
        }
        id
    }

    pub(crate) fn remove(&mut self, scope: &Scope, id: u64) -> bool {
        match scope {
            Scope::All => {
                let before = self.all.len();
                self.all.retain(|(sub_id, _)| *sub_id != id);
                before != self.all.len()
            }
            Scope::Key(key) => {
                let Some(subs) = self.by_key.get_mut(key) else {
                    return false;
                };
                let before = subs.len();
                subs.retain(|(sub_id, _)| *sub_id != id);
                let removed = before != subs.len();
                if subs.is_empty() {
                    self.by_key.remove(key);
                }
                removed
            }
        }
    }

    /// Callbacks to notify for an item with `key`: keyed subscribers first,
    /// then global ones, each in registration order
    pub(crate) fn targets(&self, key: Option<&str>) -> Vec<Callback<T>> {
        let keyed = key.and_then(|k| self.by_key.get(k)).into_iter().flatten();
        keyed
            .chain(self.all.iter())
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.all.len() + self.by_key.values().map(Vec::len).sum::<usize>()
    }

    #[cfg(test)]
    pub(crate) fn key_count(&self) -> usize {
        self.by_key.len()
    }
}

/// Handle for a registered callback.
///
/// Dropping the handle unsubscribes. Keep it alive for as long as the
/// callback should receive items.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription<T> {
    index: Weak<Mutex<SubscriberIndex<T>>>,
    scope: Scope,
    id: u64,
    active: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new(index: &Arc<Mutex<SubscriberIndex<T>>>, scope: Scope, id: u64) -> Self {
        Self {
            index: Arc::downgrade(index),
            scope,
            id,
            active: true,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Remove the callback now
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(index) = self.index.upgrade() {
            index.lock().remove(&self.scope, self.id);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("scope", &self.scope)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
