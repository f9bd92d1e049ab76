//! Client-side query layer.
//!
//! Each fetch is keyed by its full parameter tuple, so changing any filter
//! produces a new key and a fresh fetch without manual invalidation. For a
//! given key only the most recently issued request may settle: a slow
//! response that arrives after a newer request was issued is discarded.

pub mod poller;

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

pub use poller::Poller;

use crate::resolve::{ClipQuery, SeriesQuery};

/// Identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn live() -> Self {
        Self("live".to_string())
    }

    pub fn series(query: &SeriesQuery) -> Self {
        Self(format!(
            "series|{}|{}|{}|{}|{}",
            query.span,
            query.grouping,
            query.rolling_average,
            query.from.as_deref().unwrap_or_default(),
            query.to.as_deref().unwrap_or_default(),
        ))
    }

    /// The cursor index is deliberately absent: paging through a list must
    /// not refetch it.
    pub fn clips(query: &ClipQuery) -> Self {
        Self(format!(
            "clips|{}|{}|{}|{}|{}|{}|{}",
            query.slot,
            query.span,
            query.grouping,
            query.order,
            query.limit,
            query.emote.map(|e| e.as_str()).unwrap_or_default(),
            query.from.as_deref().unwrap_or_default(),
        ))
    }

    pub fn nearest_clip(unix_seconds: f64) -> Self {
        Self(format!("clip|{unix_seconds}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof that a request was issued; needed to settle its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: QueryKey,
    generation: u64,
}

impl Ticket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

#[derive(Debug)]
struct Slot<T> {
    issued: u64,
    value: Option<T>,
}

/// Thread-safe last-request-wins cache.
#[derive(Debug)]
pub struct QueryCache<T> {
    slots: Mutex<HashMap<QueryKey, Slot<T>>>,
}

impl<T> Default for QueryCache<T> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> QueryCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight request for `key`, superseding older ones.
    pub fn issue(&self, key: QueryKey) -> Ticket {
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_insert(Slot {
            issued: 0,
            value: None,
        });
        slot.issued += 1;

        Ticket {
            key,
            generation: slot.issued,
        }
    }

    /// Store a result. Returns `false` (and drops the value) when a newer
    /// request for the same key has been issued since `ticket`.
    pub fn settle(&self, ticket: &Ticket, value: T) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(&ticket.key) {
            Some(slot) if slot.issued == ticket.generation => {
                slot.value = Some(value);
                true
            }
            _ => {
                log::debug!(
                    "query.stale key={} generation={}",
                    ticket.key,
                    ticket.generation
                );
                false
            }
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<T> {
        self.slots.lock().get(key).and_then(|s| s.value.clone())
    }

    /// Issue, run `fetch`, and settle in one step.
    pub fn fetch_with<F>(&self, key: QueryKey, fetch: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        let ticket = self.issue(key);
        let value = fetch();
        self.settle(&ticket, value.clone()).then_some(value)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone + PartialEq> QueryCache<T> {
    /// Settle `value` and report whether it replaced something different.
    ///
    /// Stale tickets and results equal to the stored value both yield
    /// `false`, so pollers can print only real updates.
    pub fn settle_changed(&self, ticket: &Ticket, value: T) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(&ticket.key) {
            Some(slot) if slot.issued == ticket.generation => {
                if slot.value.as_ref() == Some(&value) {
                    return false;
                }
                slot.value = Some(value);
                true
            }
            _ => {
                log::debug!(
                    "query.stale key={} generation={}",
                    ticket.key,
                    ticket.generation
                );
                false
            }
        }
    }
}
