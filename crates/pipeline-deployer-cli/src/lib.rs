//! Pipeline Deployer CLI
//!
//! Two binaries share this library:
//!
//! - `deploy-pipelines`: upload compiled pipeline definitions, optionally
//!   adding versions and starting runs
//! - `verify-pipelines`: check that pipelines exist and their latest run is healthy
//!
//! Both exit 0 when every pipeline succeeded and 1 otherwise.

pub mod args;
pub mod commands;

pub use args::{parse_pipeline_names, DeployArgs, ServiceArgs, VerifyArgs};
pub use commands::{finish, run_deploy, run_verify};
