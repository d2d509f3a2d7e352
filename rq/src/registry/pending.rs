//! Registry of in-flight calls, keyed by verb and endpoint identity

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::domain::{CallDescriptor, CallId, Verb};

use super::staleness::StalenessPolicy;

/// Coordination key: one per distinct (verb, endpoint identity) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    verb: Verb,
    endpoint_id: String,
}

impl RegistryKey {
    pub fn new(verb: Verb, endpoint_id: impl Into<String>) -> Self {
        Self {
            verb,
            endpoint_id: endpoint_id.into(),
        }
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }
}

impl std::fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.verb, self.endpoint_id)
    }
}

/// A call recorded as in flight
#[derive(Debug, Clone)]
pub struct PendingEntry {
    timestamp: DateTime<Utc>,
    call: CallDescriptor,
}

impl PendingEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn call(&self) -> &CallDescriptor {
        &self.call
    }
}

/// In-flight calls grouped by [`RegistryKey`], in insertion order
///
/// Read paths (`pendings`, `contains`) prune entries the staleness policy
/// reports as outdated before answering, so a call whose completion was never
/// signalled eventually stops blocking its key. Unknown keys behave as empty.
#[derive(Debug)]
pub struct PendingRegistry {
    pendings: HashMap<RegistryKey, Vec<PendingEntry>>,
    staleness: StalenessPolicy,
    clock: Arc<dyn Clock>,
}

impl PendingRegistry {
    pub fn new(staleness: StalenessPolicy) -> Self {
        Self::with_clock(staleness, Arc::new(SystemClock))
    }

    pub fn with_clock(staleness: StalenessPolicy, clock: Arc<dyn Clock>) -> Self {
        debug!(?staleness, "PendingRegistry::with_clock: called");
        Self {
            pendings: HashMap::new(),
            staleness,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn staleness(&self) -> StalenessPolicy {
        self.staleness
    }

    /// Record `call` as pending under its key. Duplicates are not checked here.
    pub fn add(&mut self, call: &CallDescriptor) {
        let key = call.key();
        debug!(%key, call_id = %call.id(), "PendingRegistry::add: called");
        let entry = PendingEntry {
            timestamp: self.clock.now(),
            call: call.clone(),
        };
        self.pendings.entry(key).or_default().push(entry);
    }

    /// Remove the first entry for this exact call. Returns false if absent.
    pub fn remove(&mut self, call: &CallDescriptor) -> bool {
        let key = call.key();
        debug!(%key, call_id = %call.id(), "PendingRegistry::remove: called");

        let Some(entries) = self.pendings.get_mut(&key) else {
            debug!(%key, "PendingRegistry::remove: unknown key");
            return false;
        };

        let removed = match entries.iter().position(|entry| entry.call.id() == call.id()) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => {
                debug!(%key, call_id = %call.id(), "PendingRegistry::remove: call not pending");
                false
            }
        };

        if entries.is_empty() {
            self.pendings.remove(&key);
        }
        removed
    }

    /// Snapshot of the non-stale entries for a key, oldest first
    pub fn pendings(&mut self, verb: Verb, endpoint_id: &str) -> Vec<PendingEntry> {
        let key = RegistryKey::new(verb, endpoint_id);
        self.prune(&key);
        self.pendings.get(&key).cloned().unwrap_or_default()
    }

    /// Drop every entry for a key. Returns how many were dropped.
    pub fn clear(&mut self, verb: Verb, endpoint_id: &str) -> usize {
        let key = RegistryKey::new(verb, endpoint_id);
        let cleared = self.pendings.remove(&key).map(|entries| entries.len()).unwrap_or(0);
        debug!(%key, cleared, "PendingRegistry::clear: called");
        cleared
    }

    /// True iff at least one non-stale entry remains for the key
    pub fn contains(&mut self, verb: Verb, endpoint_id: &str) -> bool {
        let key = RegistryKey::new(verb, endpoint_id);
        self.prune(&key);
        self.pendings.contains_key(&key)
    }

    /// True iff `call_id` is still pending under `key` (prunes the key first)
    pub fn holds(&mut self, key: &RegistryKey, call_id: CallId) -> bool {
        self.prune(key);
        self.pendings
            .get(key)
            .is_some_and(|entries| entries.iter().any(|entry| entry.call.id() == call_id))
    }

    /// Number of non-stale entries across all keys. Prunes every key.
    pub fn live_len(&mut self) -> usize {
        let keys: Vec<RegistryKey> = self.pendings.keys().cloned().collect();
        for key in &keys {
            self.prune(key);
        }
        self.len()
    }

    /// Total number of recorded entries across all keys, stale ones included
    pub fn len(&self) -> usize {
        self.pendings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pendings.is_empty()
    }

    fn prune(&mut self, key: &RegistryKey) {
        if !self.staleness.is_enabled() {
            return;
        }
        let Some(entries) = self.pendings.get_mut(key) else {
            return;
        };

        let now = self.clock.now();
        let staleness = self.staleness;
        let before = entries.len();
        entries.retain(|entry| !staleness.is_outdated(entry.timestamp, now));

        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(%key, pruned, "PendingRegistry::prune: dropped stale entries");
        }
        if entries.is_empty() {
            self.pendings.remove(key);
        }
    }
}

impl Default for PendingRegistry {
    fn default() -> Self {
        Self::new(StalenessPolicy::default())
    }
}
