//! `deploy-pipelines`: upload compiled pipeline definitions to Kubeflow Pipelines.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use kfp_client::KfpClient;
use pipeline_deployer_cli::{finish, run_deploy, DeployArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = DeployArgs::parse();
    pipeline_deployer::init_tracing(args.service.json, args.service.log_level());

    let client = KfpClient::connect(args.service.service_config())
        .await
        .context("Failed to connect to Kubeflow Pipelines")?;

    let report = run_deploy(&args, &client).await?;
    finish(&report, &args.service)
}
