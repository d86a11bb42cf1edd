//! Context Preservation Manager
//!
//! In-memory store keyed by work-item identity, holding the most recent
//! input and derived analysis for each issue. Last-write-wins, no history.
//! Retention is explicit: the store is capacity-bounded and evicts the
//! oldest insertion when full.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use tracing::debug;

use crate::epic_interpreter::EpicAnalysis;
use crate::work_item::WorkItemInput;

/// Default number of work items retained
pub const DEFAULT_CONTEXT_CAPACITY: usize = 1024;

/// The most recent input and analysis for one work item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub input: WorkItemInput,
    pub analysis: EpicAnalysis,
    pub stored_at: DateTime<Utc>,
}

struct StoreInner {
    entries: HashMap<i64, ContextEntry>,
    insertion_order: VecDeque<i64>,
}

/// Keyed context store with per-key last-write-wins semantics
///
/// Writes are serialized through an interior lock so concurrent
/// orchestrations of the same issue cannot lose updates.
pub struct ContextStore {
    capacity: usize,
    inner: RwLock<StoreInner>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CONTEXT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(StoreInner {
                entries: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
        }
    }

    /// Store or overwrite the context for a work item
    ///
    /// Re-storing an existing key replaces the entry without evicting
    /// anything; a new key may evict the oldest stored item.
    pub fn store_context(&self, id: i64, input: WorkItemInput, analysis: EpicAnalysis) {
        let entry = ContextEntry {
            input,
            analysis,
            stored_at: Utc::now(),
        };

        let mut inner = self.inner.write().expect("context store lock poisoned");
        if inner.entries.insert(id, entry).is_none() {
            inner.insertion_order.push_back(id);
            if inner.insertion_order.len() > self.capacity {
                if let Some(evicted) = inner.insertion_order.pop_front() {
                    inner.entries.remove(&evicted);
                    debug!(issue = evicted, "evicted oldest context entry");
                }
            }
        }
    }

    /// Look up the stored context for a work item
    ///
    /// Returns `None` for identifiers that were never analyzed (or were
    /// evicted), so callers can distinguish "never seen" from "analyzed
    /// with empty fields".
    pub fn get_context(&self, id: i64) -> Option<ContextEntry> {
        let inner = self.inner.read().expect("context store lock poisoned");
        inner.entries.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().expect("context store lock poisoned");
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}
