//! Accumulates fetched details into a keyed collection with a fixed order.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{trace, warn};

use crate::types::{CatalogItem, ItemDetail};

/// The merged view of one pipeline run.
///
/// `items` holds the display order fixed when the catalog page arrived,
/// `details` only ever contains keys present in `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    pub items: Vec<CatalogItem>,
    pub details: HashMap<String, ItemDetail>,
    pub query: String,
}

impl AggregateState {
    /// Whether every indexed key has a detail. Vacuously true for no items.
    pub fn is_complete(&self) -> bool {
        self.items
            .iter()
            .all(|item| self.details.contains_key(&item.key))
    }

    /// Number of indexed items with a detail, and the number of indexed items.
    pub fn progress(&self) -> (usize, usize) {
        let resolved = self
            .items
            .iter()
            .filter(|item| self.details.contains_key(&item.key))
            .count();
        (resolved, self.items.len())
    }
}

/// Owner of the [AggregateState].
///
/// All writers go through the mutation methods below,
/// each of which applies atomically under a single lock.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregateState>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        // A panic while holding the lock cannot leave a half applied insert,
        // so the state is still consistent.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the index and drop all previously recorded details.
    pub fn set_index(&self, items: Vec<CatalogItem>) {
        let mut state = self.lock();
        trace!(n_items = items.len(), "setting aggregate index");
        state.items = items;
        state.details.clear();
    }

    /// Record the detail for `key`, overwriting an earlier arrival.
    ///
    /// Returns `false` and leaves the state untouched if `key` is not indexed.
    pub fn record_detail(&self, key: &str, detail: ItemDetail) -> bool {
        let mut state = self.lock();
        if !state.items.iter().any(|item| item.key == key) {
            warn!(key, "ignoring detail for key that is not in the index");
            return false;
        }
        if state.details.insert(key.to_string(), detail).is_some() {
            trace!(key, "replaced previously recorded detail");
        }
        true
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> AggregateState {
        self.lock().clone()
    }

    pub fn is_complete(&self) -> bool {
        self.lock().is_complete()
    }

    pub fn progress(&self) -> (usize, usize) {
        self.lock().progress()
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.lock().query = query.into();
    }

    pub fn query(&self) -> String {
        self.lock().query.clone()
    }

    /// Clear index and details but keep the live query.
    pub(crate) fn clear(&self) {
        let mut state = self.lock();
        state.items.clear();
        state.details.clear();
    }

    /// Discard everything, including the query.
    pub fn reset(&self) {
        *self.lock() = AggregateState::default();
    }
}
