//! Domain types for request coordination
//!
//! Verbs, modes, call templates/descriptors and strategy decisions.

mod call;
mod decision;
mod mode;
mod verb;

pub use call::{CallDescriptor, CallId, CallTemplate};
pub use decision::{Decision, RejectionReason};
pub use mode::Mode;
pub use verb::Verb;
