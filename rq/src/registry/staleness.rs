//! Staleness policy for pending entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decides whether a pending entry is too old to still count as in flight
///
/// Guards against entries leaking when a completion signal is lost.
/// A threshold of zero or below disables staleness, which is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalenessPolicy {
    stale_after_ms: i64,
}

impl StalenessPolicy {
    pub fn new(stale_after_ms: i64) -> Self {
        Self { stale_after_ms }
    }

    pub fn disabled() -> Self {
        Self::new(-1)
    }

    pub fn stale_after_ms(&self) -> i64 {
        self.stale_after_ms
    }

    pub fn is_enabled(&self) -> bool {
        self.stale_after_ms > 0
    }

    /// True iff staleness is enabled and `|now - recorded_at| >= threshold`
    pub fn is_outdated(&self, recorded_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        (now - recorded_at).num_milliseconds().abs() >= self.stale_after_ms
    }
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
