//! Pipeline Deployer Core Library
//!
//! Deploys compiled pipeline definitions to an orchestration service and
//! verifies the health of registered pipelines. Everything talks to the
//! service through [`pipeline_service::PipelineService`].

pub mod catalog;
pub mod clock;
pub mod deploy;
pub mod error;
pub mod obs;
pub mod reporter;
pub mod telemetry;
pub mod verify;

pub use catalog::{pipeline_name_from_path, scan_catalog, PipelineArtifact, PIPELINE_EXTENSIONS};
pub use clock::{Clock, ManualClock, TokioClock};
pub use deploy::{
    unique_name, DeployAction, DeployOptions, DeployReceipt, Deployer, DeploymentOutcome,
};
pub use error::{CatalogError, DeployError, Result};
pub use reporter::{BatchReport, Outcome, ReportEntry, ReportKind, Summary};
pub use telemetry::init_tracing;
pub use verify::{
    PollOutcome, RunPoller, VerificationOutcome, Verdict, Verifier, DEFAULT_POLL_INTERVAL,
    DEFAULT_WAIT_TIMEOUT, MIN_POLL_INTERVAL,
};
