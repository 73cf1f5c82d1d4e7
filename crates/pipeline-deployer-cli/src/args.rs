//! Command-line arguments of `deploy-pipelines` and `verify-pipelines`.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{Args, Parser};
use kfp_client::{ServiceConfig, DEFAULT_REQUEST_TIMEOUT};
use tracing::Level;

/// Connection and output flags shared by both commands.
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// Kubeflow Pipelines API endpoint (e.g. http://localhost:8080)
    #[arg(long, env = "KFP_ENDPOINT")]
    pub endpoint: String,

    /// Kubernetes namespace of the Kubeflow deployment
    #[arg(long, env = "KFP_NAMESPACE", default_value = "kubeflow")]
    pub namespace: String,

    /// Scope requests to the namespace (multi-user Kubeflow)
    #[arg(long, env = "KFP_MULTI_USER", value_parser = BoolishValueParser::new())]
    pub multi_user: bool,

    /// Seconds before a single API request is abandoned
    #[arg(
        long,
        env = "KFP_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// Bearer token for an authenticating proxy
    #[arg(long, env = "KFP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    pub json: bool,

    /// Also write the summary as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl ServiceArgs {
    pub fn service_config(&self) -> ServiceConfig {
        let config = ServiceConfig::new(&self.endpoint)
            .with_namespace(&self.namespace)
            .with_multi_user(self.multi_user)
            .with_timeout(Duration::from_secs(self.request_timeout));
        match self.token {
            Some(ref token) => config.with_token(token),
            None => config,
        }
    }

    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

/// Deploy compiled pipeline definitions to Kubeflow Pipelines.
#[derive(Debug, Clone, Parser)]
#[command(name = "deploy-pipelines")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct DeployArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Directory containing compiled pipeline YAML files
    #[arg(long, default_value = "compiled_pipelines")]
    pub compiled_dir: PathBuf,

    /// Experiment that started runs are filed under
    #[arg(long, default_value = "Default")]
    pub experiment: String,

    /// Upload a new version when the pipeline already exists
    #[arg(long)]
    pub create_version: bool,

    /// Start a run of each pipeline after uploading it
    #[arg(long)]
    pub run_pipeline: bool,

    /// Number of files uploaded in parallel
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,
}

/// Verify that Kubeflow pipelines exist and their latest runs are healthy.
#[derive(Debug, Clone, Parser)]
#[command(name = "verify-pipelines")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct VerifyArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Comma-separated pipeline names (default: every registered pipeline)
    #[arg(long)]
    pub pipeline_names: Option<String>,

    /// Seconds to wait for an in-flight run to finish
    #[arg(long, default_value_t = 60)]
    pub wait_timeout: u64,

    /// Seconds between two status checks of an in-flight run
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,
}

impl VerifyArgs {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

/// Split a comma-separated list, trimming blanks and dropping empty entries.
pub fn parse_pipeline_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
