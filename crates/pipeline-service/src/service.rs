//! Service trait definitions for the deployer
//!
//! `PipelineService` is the single seam between the orchestrators and a
//! concrete orchestration backend:
//! - experiments: idempotent get-or-create by name
//! - pipelines: lookup by name, upload, upload a new version, list
//! - runs: trigger, list (newest first), fetch by id
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Result type for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// Service-assigned experiment identifier
    ExperimentId
);
string_id!(
    /// Service-assigned pipeline identifier
    PipelineId
);
string_id!(
    /// Service-assigned run identifier
    RunId
);

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A named grouping container for runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: ExperimentId,
    pub name: String,
}

/// A registered pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: PipelineId,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// An additional upload of a pipeline definition under an existing pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVersionRecord {
    /// Version id assigned by the service
    pub id: String,
    /// Version name as uploaded
    pub name: String,
    /// Owning pipeline
    pub pipeline_id: PipelineId,
}

/// A single execution of a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub name: String,
    pub pipeline_id: Option<PipelineId>,
    pub status: RunStatus,
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

/// Status of a run.
///
/// Progresses monotonically toward a terminal value. `Pending` and `Running`
/// are non-terminal; so is every status this crate does not recognise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Error,
    Skipped,
    Terminated,
    /// Anything else the service reports, kept verbatim
    Unknown(String),
}

impl RunStatus {
    /// Parse a service status string.
    ///
    /// Matching is case-insensitive. An empty status means the run has not
    /// been picked up yet and parses as `Pending`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "pending" => RunStatus::Pending,
            "running" => RunStatus::Running,
            "succeeded" => RunStatus::Succeeded,
            "failed" => RunStatus::Failed,
            "error" => RunStatus::Error,
            "skipped" => RunStatus::Skipped,
            "terminated" => RunStatus::Terminated,
            _ => RunStatus::Unknown(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Succeeded => "Succeeded",
            RunStatus::Failed => "Failed",
            RunStatus::Error => "Error",
            RunStatus::Skipped => "Skipped",
            RunStatus::Terminated => "Terminated",
            RunStatus::Unknown(raw) => raw,
        }
    }

    /// No further transition happens after a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.is_success() || self.is_failure()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Succeeded)
    }

    /// Terminal, but not `Succeeded`.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Error | RunStatus::Skipped | RunStatus::Terminated
        )
    }
}

impl From<String> for RunStatus {
    fn from(raw: String) -> Self {
        RunStatus::parse(&raw)
    }
}

impl From<RunStatus> for String {
    fn from(status: RunStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PipelineService
// ---------------------------------------------------------------------------

/// Capability contract of a pipeline-orchestration service.
///
/// Guarantees expected from implementations:
/// - `resolve_experiment` is idempotent: the same name yields the same id.
/// - `lookup_pipeline_id` reports absence as `Ok(None)`, never as an error.
/// - `list_runs` returns runs newest first.
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Get the experiment with this name, creating it if absent.
    async fn resolve_experiment(&self, name: &str) -> ServiceResult<Experiment>;

    /// Find the id of the pipeline registered under `name`.
    async fn lookup_pipeline_id(&self, name: &str) -> ServiceResult<Option<PipelineId>>;

    /// Register the package at `package` as a new pipeline called `name`.
    async fn upload_pipeline(&self, package: &Path, name: &str) -> ServiceResult<PipelineRecord>;

    /// Upload `package` as a new version of an existing pipeline.
    async fn upload_pipeline_version(
        &self,
        package: &Path,
        version_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<PipelineVersionRecord>;

    /// Start a run of `pipeline_id` inside `experiment_id`.
    async fn trigger_run(
        &self,
        experiment_id: &ExperimentId,
        job_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<RunId>;

    /// List every registered pipeline.
    async fn list_pipelines(&self) -> ServiceResult<Vec<PipelineRecord>>;

    /// List runs, newest first, optionally restricted to one pipeline.
    async fn list_runs(&self, pipeline_id: Option<&PipelineId>) -> ServiceResult<Vec<Run>>;

    /// Fetch a single run. Returns `ServiceError::NotFound` if absent.
    async fn get_run(&self, run_id: &RunId) -> ServiceResult<Run>;
}
