//! Call templates and descriptors
//!
//! A [`CallTemplate`] is what a caller hands to the coordinator: verb, URL and
//! optional overrides. The coordinator turns it into a [`CallDescriptor`] with
//! a resolved mode, a resolved endpoint identity and its own cancellation
//! handle. The descriptor is returned to the caller rather than attached to
//! the caller's request object.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cancel::CancelHandle;
use crate::registry::RegistryKey;

use super::decision::RejectionReason;
use super::mode::Mode;
use super::verb::Verb;

/// Unique identity of one coordinated call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-side description of a request about to be issued
#[derive(Debug, Clone)]
pub struct CallTemplate {
    pub(crate) verb: Verb,
    pub(crate) url: String,
    pub(crate) endpoint_id: Option<String>,
    pub(crate) mode: Option<Mode>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl CallTemplate {
    pub fn new(verb: Verb, url: impl Into<String>) -> Self {
        Self {
            verb,
            url: url.into(),
            endpoint_id: None,
            mode: None,
            timeout: None,
            cancellation: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Verb::Get, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Verb::Head, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Verb::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Verb::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Verb::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Verb::Delete, url)
    }

    /// Coordinate on a logical identity instead of the URL
    pub fn with_endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    /// Override the per-verb default mode for this call
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Cancel the call once `timeout` has elapsed. A zero duration is ignored.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    /// Compose a caller-owned cancellation source with the call's own handle
    ///
    /// Cancelling `token` cancels the call. Cancelling the call (abort,
    /// timeout) leaves `token` untouched.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// A call as tracked by the coordinator
///
/// `mode` and `endpoint_id` are fixed at construction. Clones share the same
/// cancellation handle, so a clone held by the registry and the caller's copy
/// observe the same cancellation and rejection state. Equality is identity:
/// two descriptors are equal when they describe the same call.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    id: CallId,
    verb: Verb,
    url: String,
    endpoint_id: String,
    mode: Mode,
    created_at: DateTime<Utc>,
    handle: CancelHandle,
}

impl CallDescriptor {
    /// Resolve a template into a descriptor
    ///
    /// The template's mode wins over `default_mode`; the endpoint identity
    /// defaults to the URL.
    pub fn new(template: CallTemplate, default_mode: Mode, created_at: DateTime<Utc>) -> Self {
        let CallTemplate {
            verb,
            url,
            endpoint_id,
            mode,
            cancellation,
            ..
        } = template;

        Self {
            id: CallId::new(),
            endpoint_id: endpoint_id.unwrap_or_else(|| url.clone()),
            verb,
            url,
            mode: mode.unwrap_or(default_mode),
            created_at,
            handle: CancelHandle::new(cancellation.as_ref()),
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn key(&self) -> RegistryKey {
        RegistryKey::new(self.verb, &self.endpoint_id)
    }

    pub fn handle(&self) -> &CancelHandle {
        &self.handle
    }

    /// Token the transport should observe to stop work early
    pub fn cancellation_token(&self) -> CancellationToken {
        self.handle.token()
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Why the coordinator declined this call, if it did
    pub fn rejection(&self) -> Option<RejectionReason> {
        self.handle.rejection()
    }
}

impl PartialEq for CallDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CallDescriptor {}
