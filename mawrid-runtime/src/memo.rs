//! Memoizing instance cache with ordered disposal.
//!
//! A [`MemoMap`] backs the singleton and scoped lifetimes. It remembers
//! the order in which instances were created so that disposal can run
//! finalizers in exact reverse order.
//!
//! # Forking
//! ```text
//!   root MemoMap (singletons)
//!        ▲            ▲
//!     fork()        fork()
//!        │            │
//!   scope-1 map   scope-2 map
//! ```
//! A fork reads through to its parent for ports it has not stored
//! itself, so entries added to the root *after* the fork are visible.
//! Writes always land in the fork and stay invisible to the parent and
//! to sibling forks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{trace, warn};

use crate::adapter::{FinalizerFn, Instance};
use crate::error::{DisposeError, FinalizerFailure};
use crate::port::Port;

struct MemoEntry {
    port: Port,
    instance: Instance,
    resolved_at: SystemTime,
    resolution_order: u64,
    finalizer: Option<FinalizerFn>,
}

#[derive(Default)]
struct MemoState {
    entries: Vec<MemoEntry>,
    index: HashMap<Port, usize>,
    next_order: u64,
}

/// Read-only view of one cached entry. Carries no instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoEntrySnapshot {
    pub port: Port,
    pub resolved_at: SystemTime,
    /// Position in this map's creation sequence, starting at `0`.
    pub resolution_order: u64,
}

/// Insertion-ordered port → instance cache.
///
/// At most one entry exists per port per map. The internal lock is
/// never held while a factory or finalizer runs, so factories may
/// resolve further ports through the same map.
pub struct MemoMap {
    parent: Option<Arc<MemoMap>>,
    state: Mutex<MemoState>,
}

impl MemoMap {
    /// Creates an empty root map.
    pub fn new() -> Self {
        Self {
            parent: None,
            state: Mutex::new(MemoState::default()),
        }
    }

    /// Creates a child map that reads through to `self`.
    pub fn fork(self: &Arc<Self>) -> MemoMap {
        Self {
            parent: Some(Arc::clone(self)),
            state: Mutex::new(MemoState::default()),
        }
    }

    /// Returns the cached instance, looking through to the parent.
    pub fn get(&self, port: &Port) -> Option<Instance> {
        {
            let state = self.state.lock();
            if let Some(&position) = state.index.get(port) {
                return Some(Arc::clone(&state.entries[position].instance));
            }
        }

        self.parent.as_ref().and_then(|parent| parent.get(port))
    }

    /// Returns `true` if `port` is cached here or in the parent. Never
    /// creates anything.
    pub fn has(&self, port: &Port) -> bool {
        if self.state.lock().index.contains_key(port) {
            return true;
        }

        self.parent.as_ref().is_some_and(|parent| parent.has(port))
    }

    /// Returns the cached instance, or runs `factory` once and caches
    /// its result together with `finalizer`.
    ///
    /// A failing factory caches nothing; the next call runs it again.
    pub fn get_or_else_memoize<F, E>(
        &self,
        port: &Port,
        factory: F,
        finalizer: Option<&FinalizerFn>,
    ) -> Result<Instance, E>
    where
        F: FnOnce() -> Result<Instance, E>,
    {
        if let Some(instance) = self.get(port) {
            return Ok(instance);
        }

        let instance = factory()?;

        let mut state = self.state.lock();
        if let Some(&position) = state.index.get(port) {
            // Only reachable if the factory itself memoized this port.
            return Ok(Arc::clone(&state.entries[position].instance));
        }

        let resolution_order = state.next_order;
        state.next_order += 1;

        trace!(port = %port, order = resolution_order, "Memoized instance");

        let position = state.entries.len();
        state.entries.push(MemoEntry {
            port: port.clone(),
            instance: Arc::clone(&instance),
            resolved_at: SystemTime::now(),
            resolution_order,
            finalizer: finalizer.cloned(),
        });
        state.index.insert(port.clone(), position);

        Ok(instance)
    }

    /// Snapshot of this map's own entries in creation order.
    ///
    /// Parent entries are not included.
    pub fn entries(&self) -> Vec<MemoEntrySnapshot> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|entry| MemoEntrySnapshot {
                port: entry.port.clone(),
                resolved_at: entry.resolved_at,
                resolution_order: entry.resolution_order,
            })
            .collect()
    }

    /// Number of entries stored in this map, excluding the parent.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every finalizer in reverse creation order and empties the map.
    ///
    /// Each finalizer is awaited before the next one starts. A failing
    /// finalizer does not stop the others; all failures are returned
    /// together once every finalizer has run. Calling this again on an
    /// emptied map is a no-op.
    pub async fn dispose(&self) -> Result<(), DisposeError> {
        let entries = {
            let mut state = self.state.lock();
            state.index.clear();
            std::mem::take(&mut state.entries)
        };

        let mut failures = Vec::new();

        for entry in entries.into_iter().rev() {
            let Some(finalizer) = entry.finalizer else {
                continue;
            };

            trace!(port = %entry.port, order = entry.resolution_order, "Finalizing instance");

            if let Err(source) = finalizer(entry.instance).await {
                warn!(port = %entry.port, error = %source, "Finalizer failed, continuing disposal");
                failures.push(FinalizerFailure {
                    port_name: entry.port.name().to_string(),
                    source,
                });
            }
        }

        DisposeError::check(failures)
    }
}

impl Default for MemoMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoMap")
            .field("entries", &self.len())
            .field("forked", &self.parent.is_some())
            .finish()
    }
}
