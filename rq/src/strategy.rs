//! Coordination strategies
//!
//! Each strategy decides the fate of a new call from what is already pending
//! under the same key, and updates the registry accordingly:
//!
//! - **Prevent**: reject while anything is pending (avoids double submits)
//! - **Abort**: cancel everything pending, then admit (latest wins)
//! - **Force**: always admit (parallel-safe calls)

use tracing::{debug, info};

use crate::domain::{CallDescriptor, Decision, Mode, RejectionReason};
use crate::registry::PendingRegistry;

/// Dispatch `call` to the strategy for `mode`
pub fn apply(mode: Mode, registry: &mut PendingRegistry, call: &CallDescriptor) -> Decision {
    match mode {
        Mode::Prevent => prevent(registry, call),
        Mode::Abort => abort(registry, call),
        Mode::Force => force(registry, call),
    }
}

/// Admit `call` only when nothing is pending under its key
pub fn prevent(registry: &mut PendingRegistry, call: &CallDescriptor) -> Decision {
    debug!(key = %call.key(), call_id = %call.id(), "strategy::prevent: called");

    if registry.contains(call.verb(), call.endpoint_id()) {
        info!(key = %call.key(), call_id = %call.id(), "Rejected duplicate call");
        call.handle().reject(RejectionReason::Duplicate);
        return Decision::Rejected(RejectionReason::Duplicate);
    }

    registry.add(call);
    Decision::Admitted
}

/// Admit `call` unconditionally
pub fn force(registry: &mut PendingRegistry, call: &CallDescriptor) -> Decision {
    debug!(key = %call.key(), call_id = %call.id(), "strategy::force: called");
    registry.add(call);
    Decision::Admitted
}

/// Cancel every pending call under `call`'s key, then admit `call`
///
/// All pending entries are superseded, not only the most recent one, so the
/// new call is the only one left registered.
pub fn abort(registry: &mut PendingRegistry, call: &CallDescriptor) -> Decision {
    debug!(key = %call.key(), call_id = %call.id(), "strategy::abort: called");

    let pendings = registry.pendings(call.verb(), call.endpoint_id());
    for entry in &pendings {
        let superseded = entry.call();
        debug!(key = %call.key(), superseded = %superseded.id(), "strategy::abort: cancelling pending call");
        superseded.handle().reject(RejectionReason::Superseded);
        superseded.handle().cancel();
    }
    if !pendings.is_empty() {
        info!(key = %call.key(), count = pendings.len(), "Superseded pending calls");
    }

    registry.clear(call.verb(), call.endpoint_id());
    registry.add(call);
    Decision::Admitted
}
