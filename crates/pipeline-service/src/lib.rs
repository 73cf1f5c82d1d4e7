//! Pipeline-Service: the orchestration service contract
//!
//! This crate describes everything the deployer needs from a remote
//! pipeline-orchestration service, without committing to a wire format.
//!
//! ## Key Components
//!
//! - `PipelineService`: async capability trait (experiments, pipelines, runs)
//! - `RunStatus`: run lifecycle with explicit terminal/non-terminal tables
//! - `ServiceError`: error taxonomy shared by every binding
//! - `fakes::MemoryPipelineService`: scriptable in-memory implementation

mod error;
pub mod fakes;
pub mod service;

pub use error::ServiceError;
pub use service::{
    Experiment, ExperimentId, PipelineId, PipelineRecord, PipelineService, PipelineVersionRecord,
    Run, RunId, RunStatus, ServiceResult,
};
