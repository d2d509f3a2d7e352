//! Coordinator implementation

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::arm_timeout;
use crate::clock::{Clock, SystemClock};
use crate::config::SyncPolicy;
use crate::domain::{CallDescriptor, CallId, CallTemplate, Decision, Mode, RejectionReason, Verb};
use crate::error::SyncError;
use crate::registry::{PendingEntry, PendingRegistry, RegistryKey};
use crate::strategy;

/// Statistics for the coordinator
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorStats {
    pub total_admitted: u64,
    pub total_duplicates: u64,
    pub total_superseded: u64,
    pub total_completed: u64,
    pub total_timed_out: u64,
    /// Most non-stale calls pending at once, across all keys
    pub peak_pending: usize,
}

/// Internal state protected by mutex
struct CoordinatorInner {
    /// In-flight calls per (verb, endpoint)
    registry: PendingRegistry,

    /// Armed timeout timers of admitted calls, with the key each call is pending under
    timers: HashMap<CallId, (RegistryKey, JoinHandle<()>)>,

    /// Statistics
    stats: CoordinatorStats,
}

impl CoordinatorInner {
    /// Drop timers whose task has exited or whose call is no longer pending
    ///
    /// Covers calls that were never ended: once the registry prunes them as
    /// stale (or an abort clears them) their timer goes too.
    fn reap_timers(&mut self) {
        let registry = &mut self.registry;
        let before = self.timers.len();
        self.timers.retain(|call_id, (key, timer)| {
            if timer.is_finished() {
                return false;
            }
            if registry.holds(key, *call_id) {
                return true;
            }
            timer.abort();
            false
        });

        let reaped = before - self.timers.len();
        if reaped > 0 {
            debug!(reaped, "CoordinatorInner::reap_timers: dropped timers");
        }
    }
}

/// The Coordinator decides, per call, whether it may start
///
/// Each call goes `begin` → (transport) → `end`. `begin` resolves the call's
/// mode and endpoint identity, gives it a cancellation handle and runs the
/// mode's strategy against the pending registry; lookup and mutation happen
/// under one lock, so two concurrent Prevent calls cannot both observe an
/// empty key. `end` retires the registry entry and disarms the call's timer.
pub struct Coordinator {
    policy: SyncPolicy,
    inner: Mutex<CoordinatorInner>,
}

impl Coordinator {
    /// Create a new coordinator with the given policy
    pub fn new(policy: SyncPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    /// Create a coordinator whose registry reads time from `clock`
    pub fn with_clock(policy: SyncPolicy, clock: Arc<dyn Clock>) -> Self {
        debug!(?policy, "Coordinator::with_clock: called");
        let registry = PendingRegistry::with_clock(policy.staleness, clock);
        Self {
            policy,
            inner: Mutex::new(CoordinatorInner {
                registry,
                timers: HashMap::new(),
                stats: CoordinatorStats::default(),
            }),
        }
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    /// Register a new call and decide whether it may proceed
    ///
    /// The returned descriptor carries the cancellation token the transport
    /// must observe. A rejected call was never recorded; calling `end` on it
    /// is a harmless no-op.
    pub async fn begin(&self, template: CallTemplate) -> (CallDescriptor, Decision) {
        debug!(verb = %template.verb(), url = %template.url(), "Coordinator::begin: called");
        let default_mode = self.policy.mode_for(template.verb());
        let timeout = template.timeout();

        let mut inner = self.inner.lock().await;
        inner.reap_timers();

        let call = CallDescriptor::new(template, default_mode, inner.registry.now());
        let superseded = match call.mode() {
            Mode::Abort => inner.registry.pendings(call.verb(), call.endpoint_id()).len(),
            _ => 0,
        };

        let decision = strategy::apply(call.mode(), &mut inner.registry, &call);

        match decision {
            Decision::Admitted => {
                debug!(call_id = %call.id(), mode = %call.mode(), "Coordinator::begin: admitted");
                inner.stats.total_admitted += 1;
                inner.stats.total_superseded += superseded as u64;
                let live = inner.registry.live_len();
                inner.stats.peak_pending = inner.stats.peak_pending.max(live);

                if let Some(timeout) = timeout {
                    debug!(call_id = %call.id(), ?timeout, "Coordinator::begin: arming timeout");
                    let timer = arm_timeout(call.handle(), timeout);
                    inner.timers.insert(call.id(), (call.key(), timer));
                }
            }
            Decision::Rejected(reason) => {
                debug!(call_id = %call.id(), %reason, "Coordinator::begin: rejected");
                inner.stats.total_duplicates += 1;
            }
        }

        (call, decision)
    }

    /// Retire a call after its transport operation settled
    ///
    /// Idempotent, and safe after cancellation or rejection.
    pub async fn end(&self, call: &CallDescriptor) {
        debug!(call_id = %call.id(), key = %call.key(), "Coordinator::end: called");
        let mut inner = self.inner.lock().await;

        if inner.registry.remove(call) {
            debug!(call_id = %call.id(), "Coordinator::end: removed from registry");
            inner.stats.total_completed += 1;
        } else {
            debug!(call_id = %call.id(), "Coordinator::end: not pending");
        }

        if let Some((_, timer)) = inner.timers.remove(&call.id()) {
            debug!(call_id = %call.id(), "Coordinator::end: disarming timeout");
            timer.abort();
        }
    }

    /// Run `operation` as a coordinated call
    ///
    /// The operation receives the call descriptor and should stop early when
    /// its cancellation token fires; it is dropped if it does not. `end` always
    /// runs before this returns. Policy rejections become
    /// `Err(SyncError::Rejected)` when the policy surfaces them, `Ok(None)`
    /// otherwise.
    pub async fn execute<F, Fut, T, E>(&self, template: CallTemplate, operation: F) -> Result<Option<T>, SyncError<E>>
    where
        F: FnOnce(CallDescriptor) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let (call, decision) = self.begin(template).await;
        debug!(call_id = %call.id(), ?decision, "Coordinator::execute: called");

        if let Decision::Rejected(reason) = decision {
            self.end(&call).await;
            return self.rejected(reason);
        }

        let token = call.cancellation_token();
        let result = tokio::select! {
            result = operation(call.clone()) => Some(result),
            _ = token.cancelled() => None,
        };

        self.end(&call).await;

        match (result, call.rejection()) {
            (Some(Ok(value)), _) => Ok(Some(value)),
            (_, Some(reason)) => self.rejected(reason),
            (Some(Err(e)), None) => Err(SyncError::Transport(e)),
            (None, None) => {
                debug!(call_id = %call.id(), "Coordinator::execute: cancelled");
                if call.handle().is_timed_out() {
                    self.inner.lock().await.stats.total_timed_out += 1;
                }
                Err(SyncError::Cancelled)
            }
        }
    }

    fn rejected<T, E>(&self, reason: RejectionReason) -> Result<Option<T>, SyncError<E>> {
        if self.policy.surface_rejections {
            Err(SyncError::Rejected { reason })
        } else {
            debug!(%reason, "Coordinator::rejected: swallowing policy rejection");
            Ok(None)
        }
    }

    /// Snapshot of the pending calls for a key (prunes stale entries)
    pub async fn pendings(&self, verb: Verb, endpoint_id: &str) -> Vec<PendingEntry> {
        let mut inner = self.inner.lock().await;
        let pendings = inner.registry.pendings(verb, endpoint_id);
        inner.reap_timers();
        pendings
    }

    /// Whether a key has a non-stale pending call (prunes stale entries)
    pub async fn contains(&self, verb: Verb, endpoint_id: &str) -> bool {
        let mut inner = self.inner.lock().await;
        let contains = inner.registry.contains(verb, endpoint_id);
        inner.reap_timers();
        contains
    }

    /// Get the coordinator statistics
    pub async fn stats(&self) -> CoordinatorStats {
        let inner = self.inner.lock().await;
        inner.stats.clone()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(SyncPolicy::default())
    }
}
