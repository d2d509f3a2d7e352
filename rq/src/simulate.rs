//! Scripted call bursts against a coordinator
//!
//! Issues a series of calls to one endpoint with fixed spacing, each "taking"
//! a fixed latency in place of a real transport, and reports what the
//! coordinator made of them. Backs the `rq simulate` command.

use std::convert::Infallible;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::coordinator::{Coordinator, CoordinatorStats};
use crate::domain::{CallTemplate, Mode, RejectionReason, Verb};
use crate::error::SyncError;

/// What to simulate
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub verb: Verb,
    pub url: String,
    pub endpoint_id: Option<String>,
    pub mode: Option<Mode>,
    pub count: usize,
    pub spacing: Duration,
    pub latency: Duration,
    pub timeout: Option<Duration>,
}

impl SimulationPlan {
    pub fn new(verb: Verb, url: impl Into<String>) -> Self {
        Self {
            verb,
            url: url.into(),
            endpoint_id: None,
            mode: None,
            count: 3,
            spacing: Duration::from_millis(10),
            latency: Duration::from_millis(100),
            timeout: None,
        }
    }

    fn template(&self) -> CallTemplate {
        let mut template = CallTemplate::new(self.verb, self.url.clone());
        if let Some(endpoint_id) = &self.endpoint_id {
            template = template.with_endpoint_id(endpoint_id.clone());
        }
        if let Some(mode) = self.mode {
            template = template.with_mode(mode);
        }
        if let Some(timeout) = self.timeout {
            template = template.with_timeout(timeout);
        }
        template
    }
}

/// Fate of one simulated call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Completed,
    Duplicate,
    Superseded,
    /// Rejected by policy, but the policy swallows rejections
    Suppressed,
    Cancelled,
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::Superseded => write!(f, "superseded"),
            Self::Suppressed => write!(f, "suppressed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<Result<Option<()>, SyncError<Infallible>>> for CallOutcome {
    fn from(result: Result<Option<()>, SyncError<Infallible>>) -> Self {
        match result {
            Ok(Some(())) => Self::Completed,
            Ok(None) => Self::Suppressed,
            Err(SyncError::Rejected {
                reason: RejectionReason::Duplicate,
            }) => Self::Duplicate,
            Err(SyncError::Rejected {
                reason: RejectionReason::Superseded,
            }) => Self::Superseded,
            Err(SyncError::Cancelled) => Self::Cancelled,
            Err(SyncError::Transport(never)) => match never {},
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallReport {
    pub index: usize,
    pub started_ms: u64,
    pub settled_ms: u64,
    pub outcome: CallOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub calls: Vec<CallReport>,
    pub stats: CoordinatorStats,
}

/// Run `plan` against `coordinator`
pub async fn run(coordinator: &Coordinator, plan: &SimulationPlan) -> SimulationReport {
    debug!(?plan, "simulate::run: called");
    let origin = Instant::now();

    let calls = (0..plan.count).map(|index| {
        let template = plan.template();
        let latency = plan.latency;
        let delay = plan.spacing * index as u32;
        async move {
            tokio::time::sleep_until(origin + delay).await;
            let started_ms = origin.elapsed().as_millis() as u64;

            let result = coordinator
                .execute(template, |_call| async move {
                    tokio::time::sleep(latency).await;
                    Ok::<_, Infallible>(())
                })
                .await;

            let report = CallReport {
                index,
                started_ms,
                settled_ms: origin.elapsed().as_millis() as u64,
                outcome: result.into(),
            };
            debug!(index, outcome = %report.outcome, "simulate::run: call settled");
            report
        }
    });

    let calls = join_all(calls).await;
    SimulationReport {
        calls,
        stats: coordinator.stats().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncPolicy;

    fn outcomes(report: &SimulationReport) -> Vec<CallOutcome> {
        report.calls.iter().map(|c| c.outcome).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_burst_keeps_only_latest() {
        let coord = Coordinator::new(SyncPolicy::default().surface_rejections(true));
        let plan = SimulationPlan::new(Verb::Get, "/foo");

        let report = run(&coord, &plan).await;

        assert_eq!(
            outcomes(&report),
            vec![CallOutcome::Superseded, CallOutcome::Superseded, CallOutcome::Completed]
        );
        assert_eq!(report.stats.total_superseded, 2);
        assert!(!coord.contains(Verb::Get, "/foo").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prevent_burst_keeps_only_first() {
        let coord = Coordinator::new(SyncPolicy::default().surface_rejections(true));
        let plan = SimulationPlan::new(Verb::Post, "/foo");

        let report = run(&coord, &plan).await;

        assert_eq!(
            outcomes(&report),
            vec![CallOutcome::Completed, CallOutcome::Duplicate, CallOutcome::Duplicate]
        );
        assert_eq!(report.calls[0].settled_ms, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_burst_completes_everything() {
        let coord = Coordinator::default();
        let plan = SimulationPlan {
            mode: Some(Mode::Force),
            count: 4,
            ..SimulationPlan::new(Verb::Post, "/events")
        };

        let report = run(&coord, &plan).await;

        assert!(outcomes(&report).iter().all(|o| *o == CallOutcome::Completed));
        assert_eq!(report.stats.peak_pending, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_swallowed_rejections_are_suppressed() {
        let coord = Coordinator::default();
        let plan = SimulationPlan::new(Verb::Post, "/foo");

        let report = run(&coord, &plan).await;

        assert_eq!(
            outcomes(&report),
            vec![CallOutcome::Completed, CallOutcome::Suppressed, CallOutcome::Suppressed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_slow_calls() {
        let coord = Coordinator::default();
        let plan = SimulationPlan {
            count: 1,
            timeout: Some(Duration::from_millis(50)),
            ..SimulationPlan::new(Verb::Get, "/slow")
        };

        let report = run(&coord, &plan).await;

        assert_eq!(outcomes(&report), vec![CallOutcome::Cancelled]);
        assert_eq!(report.stats.total_timed_out, 1);
    }
}
