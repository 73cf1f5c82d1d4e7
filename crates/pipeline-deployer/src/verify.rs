//! Verification orchestration.
//!
//! A pipeline verifies when it exists and its most recent run either
//! succeeded or there are no runs yet. A run still in flight is polled until
//! it reaches a terminal status or the wait timeout elapses.

use std::time::Duration;

use pipeline_service::{PipelineService, Run, RunId, RunStatus, ServiceError};
use serde::Serialize;
use tracing::{info, warn, Instrument};

use crate::clock::Clock;
use crate::obs;
use crate::reporter::Outcome;

/// Time between two status fetches of an in-flight run.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Floor for the poll interval; shorter values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for an in-flight run by default.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Why a pipeline passed or failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No pipeline is registered under the name.
    NotFound,
    /// The pipeline or its runs could not be queried.
    LookupFailed { reason: String },
    /// The pipeline exists and has never run.
    NoRuns,
    RunSucceeded { run_id: RunId },
    /// The latest run ended in a terminal status other than success.
    RunFailed { run_id: RunId, status: RunStatus },
    /// The latest run was still in flight when the wait timeout elapsed.
    TimedOut {
        run_id: RunId,
        last_status: RunStatus,
        waited: Duration,
    },
    /// The run disappeared from the service while being polled.
    RunVanished { run_id: RunId },
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::NoRuns | Verdict::RunSucceeded { .. })
    }

    /// One-line description for the report.
    pub fn describe(&self) -> String {
        match self {
            Verdict::NotFound => "does not exist".to_string(),
            Verdict::LookupFailed { reason } => format!("lookup failed: {}", reason),
            Verdict::NoRuns => "exists, no runs yet".to_string(),
            Verdict::RunSucceeded { run_id } => format!("latest run {} succeeded", run_id),
            Verdict::RunFailed { run_id, status } => {
                format!("latest run {} ended with status {}", run_id, status)
            }
            Verdict::TimedOut {
                run_id,
                last_status,
                waited,
            } => format!(
                "timed out after {}s waiting for run {} (last status: {})",
                waited.as_secs(),
                run_id,
                last_status
            ),
            Verdict::RunVanished { run_id } => {
                format!("run {} disappeared while waiting", run_id)
            }
        }
    }
}

/// Per-pipeline outcome of a verification batch.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub subject: String,
    pub success: bool,
    pub detail: String,
    pub verdict: Verdict,
}

impl VerificationOutcome {
    pub fn new(pipeline: &str, verdict: Verdict) -> Self {
        VerificationOutcome {
            subject: pipeline.to_string(),
            success: verdict.is_success(),
            detail: verdict.describe(),
            verdict,
        }
    }
}

impl Outcome for VerificationOutcome {
    fn subject(&self) -> &str {
        &self.subject
    }

    fn succeeded(&self) -> bool {
        self.success
    }

    fn detail(&self) -> &str {
        &self.detail
    }
}

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The run reached a terminal status.
    Finished(RunStatus),
    /// Still non-terminal when the timeout elapsed.
    TimedOut { last_status: RunStatus, waited: Duration },
    /// The service no longer knows the run.
    Vanished,
}

/// Polls one run until it is terminal or the timeout elapses.
///
/// Each iteration sleeps `interval` first, then re-fetches the run. The loop
/// continues while less than `timeout` has elapsed and the status is
/// non-terminal, so it returns within `timeout + interval`. The interval is
/// never below [`MIN_POLL_INTERVAL`].
pub struct RunPoller<'a> {
    service: &'a dyn PipelineService,
    clock: &'a dyn Clock,
    interval: Duration,
    timeout: Duration,
}

impl<'a> RunPoller<'a> {
    pub fn new(
        service: &'a dyn PipelineService,
        clock: &'a dyn Clock,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            clock,
            interval: interval.max(MIN_POLL_INTERVAL),
            timeout,
        }
    }

    pub async fn poll(&self, run: &Run) -> PollOutcome {
        let started = self.clock.now();
        let mut status = run.status.clone();
        let mut elapsed = Duration::ZERO;

        while elapsed < self.timeout && !status.is_terminal() {
            self.clock.sleep(self.interval).await;
            elapsed = self.clock.now().saturating_sub(started);

            match self.service.get_run(&run.id).await {
                Ok(latest) => status = latest.status,
                Err(ServiceError::NotFound { .. }) => return PollOutcome::Vanished,
                Err(e) => {
                    warn!(run_id = %run.id, error = %e, "Failed to refresh run status")
                }
            }
            obs::emit_run_polled(run.id.as_str(), &status, elapsed.as_secs());
        }

        if status.is_terminal() {
            PollOutcome::Finished(status)
        } else {
            PollOutcome::TimedOut {
                last_status: status,
                waited: elapsed,
            }
        }
    }
}

/// Checks pipelines and the health of their latest run. Read-only.
pub struct Verifier<'a> {
    service: &'a dyn PipelineService,
    clock: &'a dyn Clock,
    poll_interval: Duration,
}

impl<'a> Verifier<'a> {
    pub fn new(service: &'a dyn PipelineService, clock: &'a dyn Clock) -> Self {
        Self {
            service,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Names of every pipeline the service lists, in listing order.
    pub async fn all_pipeline_names(&self) -> Result<Vec<String>, ServiceError> {
        let pipelines = self.service.list_pipelines().await?;
        Ok(pipelines.into_iter().map(|p| p.name).collect())
    }

    /// Verify one pipeline, waiting at most `timeout` for an in-flight run.
    pub async fn verify(&self, pipeline: &str, timeout: Duration) -> VerificationOutcome {
        let verdict = self.evaluate(pipeline, timeout).await;
        let outcome = VerificationOutcome::new(pipeline, verdict);
        obs::emit_pipeline_verified(pipeline, outcome.success, &outcome.detail);
        outcome
    }

    /// Verify each pipeline in turn, fail-soft.
    pub async fn verify_all(&self, pipelines: &[String], timeout: Duration) -> Vec<VerificationOutcome> {
        let mut outcomes = Vec::with_capacity(pipelines.len());
        for name in pipelines {
            let outcome = self
                .verify(name, timeout)
                .instrument(obs::pipeline_span("verify", name))
                .await;
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn evaluate(&self, pipeline: &str, timeout: Duration) -> Verdict {
        let pipeline_id = match self.service.lookup_pipeline_id(pipeline).await {
            Ok(Some(id)) => id,
            Ok(None) => return Verdict::NotFound,
            Err(e) => {
                return Verdict::LookupFailed {
                    reason: e.to_string(),
                }
            }
        };

        let runs = match self.service.list_runs(Some(&pipeline_id)).await {
            Ok(runs) => runs,
            Err(e) => {
                return Verdict::LookupFailed {
                    reason: e.to_string(),
                }
            }
        };

        // newest first
        let Some(latest) = runs.into_iter().next() else {
            return Verdict::NoRuns;
        };

        if latest.status.is_success() {
            return Verdict::RunSucceeded { run_id: latest.id };
        }
        if latest.status.is_failure() {
            return Verdict::RunFailed {
                run_id: latest.id,
                status: latest.status,
            };
        }

        info!(
            pipeline = %pipeline,
            run_id = %latest.id,
            status = %latest.status,
            timeout_secs = timeout.as_secs(),
            "Waiting for run to finish"
        );
        let poller = RunPoller::new(self.service, self.clock, self.poll_interval, timeout);
        match poller.poll(&latest).await {
            PollOutcome::Finished(status) if status.is_success() => {
                Verdict::RunSucceeded { run_id: latest.id }
            }
            PollOutcome::Finished(status) => Verdict::RunFailed {
                run_id: latest.id,
                status,
            },
            PollOutcome::TimedOut {
                last_status,
                waited,
            } => Verdict::TimedOut {
                run_id: latest.id,
                last_status,
                waited,
            },
            PollOutcome::Vanished => Verdict::RunVanished { run_id: latest.id },
        }
    }
}
