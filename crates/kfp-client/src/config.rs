//! Connection settings for a Kubeflow Pipelines API server

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Kubeflow Pipelines connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// API server URL (e.g. http://localhost:8080)
    pub endpoint: String,
    /// Kubernetes namespace Kubeflow is deployed in / the user profile namespace
    pub namespace: String,
    /// Send namespace resource references (multi-user deployments only)
    pub multi_user: bool,
    /// Bearer token (optional; required behind an authenticating proxy)
    pub token: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ServiceConfig {
    /// Create config for a specific endpoint with default settings
    pub fn new(endpoint: &str) -> Self {
        ServiceConfig {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            namespace: "kubeflow".to_string(),
            multi_user: false,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_multi_user(mut self, multi_user: bool) -> Self {
        self.multi_user = multi_user;
        self
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
