//! `verify-pipelines`: check registered pipelines and their latest runs.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use kfp_client::KfpClient;
use pipeline_deployer::TokioClock;
use pipeline_deployer_cli::{finish, run_verify, VerifyArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = VerifyArgs::parse();
    pipeline_deployer::init_tracing(args.service.json, args.service.log_level());

    let client = KfpClient::connect(args.service.service_config())
        .await
        .context("Failed to connect to Kubeflow Pipelines")?;

    let report = run_verify(&args, &client, &TokioClock::new()).await?;
    finish(&report, &args.service)
}
