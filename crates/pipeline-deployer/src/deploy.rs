//! Deployment orchestration.
//!
//! For each compiled pipeline definition, decide between creating a new
//! pipeline, adding a version to an existing one, or re-uploading under the
//! same name; optionally start a run of the result. Files are processed
//! independently: one failure never stops the batch.

use std::path::Path;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use pipeline_service::{
    ExperimentId, PipelineId, PipelineService, PipelineVersionRecord, RunId, ServiceError,
};
use serde::Serialize;
use tracing::{error, warn, Instrument};

use crate::catalog::PipelineArtifact;
use crate::error::{DeployError, Result};
use crate::obs;
use crate::reporter::Outcome;

/// Knobs for one deploy invocation.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Experiment that runs started after deployment are filed under.
    pub experiment_id: ExperimentId,
    /// Upload a new version when the pipeline already exists.
    pub create_version: bool,
    /// Start a run of each pipeline once uploaded.
    pub run_after_deploy: bool,
}

/// What the deployer did with a pipeline definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    /// No pipeline existed under the name; a new one was registered.
    Created,
    /// A new version was added under the existing pipeline id.
    Versioned,
    /// The pipeline existed and was uploaded again under the same name.
    Reuploaded,
}

impl DeployAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployAction::Created => "created",
            DeployAction::Versioned => "versioned",
            DeployAction::Reuploaded => "reuploaded",
        }
    }
}

impl std::fmt::Display for DeployAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful deployment.
#[derive(Debug, Clone)]
pub struct DeployReceipt {
    pub pipeline: String,
    /// Id of the pipeline the definition now lives under.
    pub pipeline_id: PipelineId,
    pub action: DeployAction,
    /// Set when `action` is `Versioned`.
    pub version: Option<PipelineVersionRecord>,
    /// `None` when no run was requested, otherwise the trigger result.
    pub run: Option<std::result::Result<RunId, String>>,
}

/// Per-file outcome of a batch deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentOutcome {
    pub subject: String,
    pub success: bool,
    pub detail: String,
    pub pipeline_id: Option<PipelineId>,
    pub action: Option<DeployAction>,
    pub run: Option<std::result::Result<RunId, String>>,
}

impl DeploymentOutcome {
    /// Convert a per-file result into an outcome record.
    pub fn from_result(pipeline: &str, result: Result<DeployReceipt>) -> Self {
        match result {
            Ok(receipt) => {
                let mut detail = format!("{} (id: {})", receipt.action, receipt.pipeline_id);
                match &receipt.run {
                    Some(Ok(run_id)) => detail.push_str(&format!(", run {} started", run_id)),
                    Some(Err(reason)) => {
                        detail.push_str(&format!(", run not started: {}", reason))
                    }
                    None => {}
                }
                DeploymentOutcome {
                    subject: pipeline.to_string(),
                    success: true,
                    detail,
                    pipeline_id: Some(receipt.pipeline_id),
                    action: Some(receipt.action),
                    run: receipt.run,
                }
            }
            Err(e) => {
                if e.is_connection() {
                    error!(pipeline = %pipeline, error = %e, "Lost connection to pipeline service");
                } else {
                    error!(pipeline = %pipeline, error = %e, "Deployment failed");
                }
                DeploymentOutcome {
                    subject: pipeline.to_string(),
                    success: false,
                    detail: e.to_string(),
                    pipeline_id: None,
                    action: None,
                    run: None,
                }
            }
        }
    }
}

impl Outcome for DeploymentOutcome {
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

/// `<name>-<unix seconds>`, used for version and job names.
pub fn unique_name(name: &str, timestamp: DateTime<Utc>) -> String {
    format!("{}-{}", name, timestamp.timestamp())
}

/// Deploys pipeline definitions through a [`PipelineService`].
pub struct Deployer<'a> {
    service: &'a dyn PipelineService,
    concurrency: usize,
}

impl<'a> Deployer<'a> {
    pub fn new(service: &'a dyn PipelineService) -> Self {
        Self {
            service,
            concurrency: 1,
        }
    }

    /// Allow up to `n` files in flight during [`Deployer::deploy_all`].
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Deploy one artifact using the current time for name suffixes.
    pub async fn deploy(
        &self,
        artifact: &PipelineArtifact,
        options: &DeployOptions,
    ) -> Result<DeployReceipt> {
        self.deploy_at(artifact, options, Utc::now()).await
    }

    /// Deploy one artifact at a fixed timestamp (used for deterministic tests).
    pub async fn deploy_at(
        &self,
        artifact: &PipelineArtifact,
        options: &DeployOptions,
        timestamp: DateTime<Utc>,
    ) -> Result<DeployReceipt> {
        let name = artifact.name.as_str();
        let suffixed = unique_name(name, timestamp);

        let existing = match self.service.lookup_pipeline_id(name).await {
            Ok(id) => id,
            Err(e) => {
                warn!(pipeline = %name, error = %e, "Pipeline lookup failed, treating as new");
                None
            }
        };

        let (pipeline_id, action, version) = match existing {
            Some(pipeline_id) if options.create_version => {
                let version = self
                    .service
                    .upload_pipeline_version(&artifact.path, &suffixed, &pipeline_id)
                    .await
                    .map_err(|source| upload_error(name, source))?;
                (pipeline_id, DeployAction::Versioned, Some(version))
            }
            Some(_) => {
                let record = self
                    .service
                    .upload_pipeline(&artifact.path, name)
                    .await
                    .map_err(|source| {
                        if matches!(source, ServiceError::Rejected { status: 409, .. }) {
                            warn!(
                                pipeline = %name,
                                "Pipeline already exists; enable version creation to add a new version"
                            );
                        }
                        upload_error(name, source)
                    })?;
                (record.id, DeployAction::Reuploaded, None)
            }
            None => {
                let record = self
                    .service
                    .upload_pipeline(&artifact.path, name)
                    .await
                    .map_err(|source| upload_error(name, source))?;
                (record.id, DeployAction::Created, None)
            }
        };
        obs::emit_pipeline_deployed(name, pipeline_id.as_str(), action.as_str());

        let run = if options.run_after_deploy {
            Some(
                self.start_run(name, &options.experiment_id, &suffixed, &pipeline_id)
                    .await,
            )
        } else {
            None
        };

        Ok(DeployReceipt {
            pipeline: name.to_string(),
            pipeline_id,
            action,
            version,
            run,
        })
    }

    /// Deploy a single file by path.
    pub async fn deploy_file(&self, path: &Path, options: &DeployOptions) -> Result<DeployReceipt> {
        let artifact = PipelineArtifact::from_path(path)
            .ok_or_else(|| DeployError::InvalidArtifact(path.to_path_buf()))?;
        self.deploy(&artifact, options).await
    }

    /// Deploy every artifact, fail-soft. Outcomes come back in input order.
    pub async fn deploy_all(
        &self,
        artifacts: &[PipelineArtifact],
        options: &DeployOptions,
    ) -> Vec<DeploymentOutcome> {
        stream::iter(artifacts)
            .map(move |artifact| async move {
                let result = self
                    .deploy(artifact, options)
                    .instrument(obs::pipeline_span("deploy", &artifact.name))
                    .await;
                DeploymentOutcome::from_result(&artifact.name, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn start_run(
        &self,
        pipeline: &str,
        experiment_id: &ExperimentId,
        job_name: &str,
        pipeline_id: &PipelineId,
    ) -> std::result::Result<RunId, String> {
        match self
            .service
            .trigger_run(experiment_id, job_name, pipeline_id)
            .await
        {
            Ok(run_id) => {
                obs::emit_run_triggered(pipeline, run_id.as_str());
                Ok(run_id)
            }
            Err(e) => {
                obs::emit_run_trigger_failed(pipeline, &e);
                Err(e.to_string())
            }
        }
    }
}

fn upload_error(pipeline: &str, source: ServiceError) -> DeployError {
    DeployError::Upload {
        pipeline: pipeline.to_string(),
        source,
    }
}
