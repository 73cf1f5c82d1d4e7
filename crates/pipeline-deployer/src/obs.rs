//! Structured observability hooks for deployment and verification.
//!
//! This module provides:
//! - A pipeline-scoped span to instrument per-pipeline work
//! - Emission functions for key lifecycle events: deploy, run trigger, poll, verdict
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`).

use pipeline_service::RunStatus;
use tracing::{info, warn, Span};

/// Span tagged with the pipeline name; attach with `tracing::Instrument`.
pub fn pipeline_span(operation: &'static str, pipeline: &str) -> Span {
    tracing::info_span!("pipeline", op = operation, name = %pipeline)
}

/// Emit event: pipeline uploaded (as new pipeline, re-upload or version).
pub fn emit_pipeline_deployed(pipeline: &str, pipeline_id: &str, action: &str) {
    info!(
        event = "pipeline.deployed",
        pipeline = %pipeline,
        pipeline_id = %pipeline_id,
        action = %action,
    );
}

/// Emit event: a run was started after deployment.
pub fn emit_run_triggered(pipeline: &str, run_id: &str) {
    info!(event = "run.triggered", pipeline = %pipeline, run_id = %run_id);
}

/// Emit event: starting a run after deployment failed (warning level).
pub fn emit_run_trigger_failed(pipeline: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.trigger_failed", pipeline = %pipeline, error = %error);
}

/// Emit event: one poll iteration observed a status.
pub fn emit_run_polled(run_id: &str, status: &RunStatus, elapsed_secs: u64) {
    info!(
        event = "run.polled",
        run_id = %run_id,
        status = %status,
        elapsed_secs = elapsed_secs,
    );
}

/// Emit event: verification verdict for a pipeline.
pub fn emit_pipeline_verified(pipeline: &str, success: bool, detail: &str) {
    info!(
        event = "pipeline.verified",
        pipeline = %pipeline,
        success = success,
        detail = %detail,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_span_create() {
        // Just ensure span creation and entry don't panic without a subscriber
        let _entered = pipeline_span("deploy", "hello").entered();
        emit_run_polled("run-1", &RunStatus::Running, 5);
    }
}
