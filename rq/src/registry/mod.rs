//! Pending-call bookkeeping
//!
//! [`PendingRegistry`] tracks in-flight calls per (verb, endpoint) key and
//! consults [`StalenessPolicy`] to self-heal when completions are lost.

mod pending;
mod staleness;

pub use pending::{PendingEntry, PendingRegistry, RegistryKey};
pub use staleness::StalenessPolicy;
