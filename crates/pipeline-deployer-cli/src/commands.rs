//! Command bodies, written against the service trait so they run the same
//! against the REST client and the in-memory fake.

use std::process::ExitCode;

use anyhow::{Context, Result};
use pipeline_deployer::{
    scan_catalog, BatchReport, Clock, DeployOptions, Deployer, ReportKind, Verifier,
};
use pipeline_service::PipelineService;
use tracing::info;

use crate::args::{parse_pipeline_names, DeployArgs, ServiceArgs, VerifyArgs};

/// Deploy every compiled pipeline in `args.compiled_dir`.
///
/// A missing directory or an unresolvable experiment aborts with an error.
/// An empty directory yields an empty, successful report.
pub async fn run_deploy(args: &DeployArgs, service: &dyn PipelineService) -> Result<BatchReport> {
    let artifacts = scan_catalog(&args.compiled_dir).with_context(|| {
        format!(
            "Compiled pipelines directory {} is unusable",
            args.compiled_dir.display()
        )
    })?;
    if artifacts.is_empty() {
        info!("Nothing to deploy");
        return Ok(BatchReport::from_outcomes::<pipeline_deployer::DeploymentOutcome>(
            ReportKind::Deployment,
            &[],
        ));
    }

    let experiment = service
        .resolve_experiment(&args.experiment)
        .await
        .with_context(|| format!("Failed to resolve experiment '{}'", args.experiment))?;
    info!(experiment = %experiment.name, id = %experiment.id, "Using experiment");

    let options = DeployOptions {
        experiment_id: experiment.id,
        create_version: args.create_version,
        run_after_deploy: args.run_pipeline,
    };
    info!(count = artifacts.len(), "Deploying pipelines");
    let outcomes = Deployer::new(service)
        .with_concurrency(args.concurrency)
        .deploy_all(&artifacts, &options)
        .await;

    Ok(BatchReport::from_outcomes(ReportKind::Deployment, &outcomes))
}

/// Verify the named pipelines, or every registered one when none are named.
pub async fn run_verify(
    args: &VerifyArgs,
    service: &dyn PipelineService,
    clock: &dyn Clock,
) -> Result<BatchReport> {
    let verifier = Verifier::new(service, clock).with_poll_interval(args.poll_interval());

    let names = match args.pipeline_names {
        Some(ref raw) => parse_pipeline_names(raw),
        None => verifier
            .all_pipeline_names()
            .await
            .context("Failed to list pipelines")?,
    };
    if names.is_empty() {
        info!("Nothing to verify");
        return Ok(BatchReport::from_outcomes::<pipeline_deployer::VerificationOutcome>(
            ReportKind::Verification,
            &[],
        ));
    }

    info!(count = names.len(), "Verifying pipelines");
    let outcomes = verifier.verify_all(&names, args.wait_timeout()).await;

    Ok(BatchReport::from_outcomes(ReportKind::Verification, &outcomes))
}

/// Print the summary, write the optional JSON report and map to an exit code.
pub fn finish(report: &BatchReport, args: &ServiceArgs) -> Result<ExitCode> {
    print!("{}", report.render());
    if let Some(ref path) = args.report {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Report written");
    }
    Ok(report.exit_code())
}
