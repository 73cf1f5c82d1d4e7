//! KFP-Client: Kubeflow Pipelines binding for the deployer
//!
//! Implements [`pipeline_service::PipelineService`] on top of the Kubeflow
//! Pipelines v1beta1 REST API (`/apis/v1beta1/...`).
//!
//! ## Key Components
//!
//! - `ServiceConfig`: endpoint, namespace, auth token and request timeout
//! - `KfpClient`: connected HTTP client, probes `healthz` on connect
//! - `api`: wire types of the REST API

pub mod api;
mod client;
mod config;
mod service;

pub use client::KfpClient;
pub use config::{ServiceConfig, DEFAULT_REQUEST_TIMEOUT};

/// API path prefix of the Kubeflow Pipelines v1beta1 REST surface
pub const API_PREFIX: &str = "apis/v1beta1";
