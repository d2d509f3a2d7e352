//! reqsync - per-endpoint coordination of concurrent outbound requests
//!
//! Decides, for every outgoing call, whether it may start given what is
//! already in flight for the same verb and endpoint, and cancels calls that
//! have been superseded. No I/O happens here: callers run the transport
//! themselves and report completion back.
//!
//! # Core Concepts
//!
//! - **Prevent**: reject a call while an identical one is pending (double submit)
//! - **Abort**: cancel pending calls and let the newest one through (latest wins)
//! - **Force**: let every call through
//! - **Staleness**: pending entries older than a threshold stop counting
//!
//! # Modules
//!
//! - [`coordinator`] - `begin`/`end` facade and the `execute` helper
//! - [`strategy`] - the three coordination strategies
//! - [`registry`] - pending-call registry and staleness policy
//! - [`cancel`] - per-call cancellation handles and timeouts
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use reqsync::{CallTemplate, Coordinator, SyncPolicy};
//!
//! let coordinator = Coordinator::new(SyncPolicy::default());
//! let body = coordinator
//!     .execute(CallTemplate::get("/feed"), |call| fetch("/feed", call.cancellation_token()))
//!     .await?;
//! ```

pub mod cancel;
pub mod cli;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod registry;
pub mod simulate;
pub mod strategy;

// Re-export commonly used types
pub use cancel::CancelHandle;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ModeTable, SyncPolicy};
pub use coordinator::{Coordinator, CoordinatorStats};
pub use domain::{CallDescriptor, CallId, CallTemplate, Decision, Mode, RejectionReason, Verb};
pub use error::{ConfigError, SyncError};
pub use registry::{PendingEntry, PendingRegistry, RegistryKey, StalenessPolicy};
pub use simulate::{CallOutcome, CallReport, SimulationPlan, SimulationReport};
