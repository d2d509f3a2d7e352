//! Per-call cancellation handles
//!
//! Every call gets its own [`CancellationToken`]. When the caller brings a
//! token of its own, the call's token is a child of it: cancelling the
//! caller's token reaches the call, while the coordinator cancelling the call
//! (abort, timeout) never fires the caller's token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::RejectionReason;

/// Cancellation sink and rejection marker for one call
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    rejection: Arc<OnceLock<RejectionReason>>,
    timed_out: Arc<AtomicBool>,
}

impl CancelHandle {
    pub(crate) fn new(parent: Option<&CancellationToken>) -> Self {
        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        Self {
            token,
            rejection: Arc::new(OnceLock::new()),
            timed_out: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the call has been cancelled from any source
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        self.rejection.get().copied()
    }

    /// True iff the call's own timeout fired (not the caller or a superseding call)
    pub fn is_timed_out(&self) -> bool {
        self.timed_out.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel because the timeout elapsed. No-op when already cancelled.
    pub(crate) fn time_out(&self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.timed_out.store(true, Ordering::Release);
        self.token.cancel();
        true
    }

    /// Record why the call was declined. The first reason sticks.
    pub(crate) fn reject(&self, reason: RejectionReason) -> bool {
        self.rejection.set(reason).is_ok()
    }
}

/// Spawn a timer that cancels `handle` after `timeout`
///
/// The timer fires at most once. It exits without firing when the handle is
/// cancelled by another source first; the returned task is aborted when the
/// call ends.
pub(crate) fn arm_timeout(handle: &CancelHandle, timeout: Duration) -> JoinHandle<()> {
    let handle = handle.clone();
    debug!(?timeout, "arm_timeout: called");
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                debug!(?timeout, "arm_timeout: timeout reached, cancelling call");
                handle.time_out();
            }
            _ = handle.cancelled() => {
                debug!("arm_timeout: call cancelled before timeout");
            }
        }
    })
}
