//! HTTP plumbing for the Kubeflow Pipelines API server.

use pipeline_service::{ServiceError, ServiceResult};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::API_PREFIX;

/// Connected Kubeflow Pipelines client.
///
/// Construct with [`KfpClient::connect`], which fails fast with
/// `ServiceError::Connection` when the API server is unreachable.
#[derive(Debug, Clone)]
pub struct KfpClient {
    pub(crate) config: ServiceConfig,
    http: HttpClient,
}

impl KfpClient {
    /// Build a client without contacting the server.
    pub fn new(config: ServiceConfig) -> ServiceResult<Self> {
        if !config.endpoint.starts_with("http://") && !config.endpoint.starts_with("https://") {
            return Err(ServiceError::Connection {
                endpoint: config.endpoint.clone(),
                reason: "endpoint must start with http:// or https://".to_string(),
            });
        }

        let http = HttpClient::builder()
            .user_agent(concat!("pipeline-deployer/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Connection {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;

        Ok(KfpClient { config, http })
    }

    /// Build a client and check the server's health endpoint.
    pub async fn connect(config: ServiceConfig) -> ServiceResult<Self> {
        let client = Self::new(config)?;
        client.health_check().await?;
        info!(endpoint = %client.config.endpoint, "Connected to Kubeflow Pipelines");
        Ok(client)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// `GET /healthz`; any failure is reported as a connection error.
    pub async fn health_check(&self) -> ServiceResult<()> {
        let response = self.get("healthz").send().await.map_err(|e| self.unreachable(e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ServiceError::Connection {
                endpoint: self.config.endpoint.clone(),
                reason: format!("health check returned HTTP {}", status.as_u16()),
            })
        }
    }

    /// Build a full URL from an API path.
    pub(crate) fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}/{}", self.config.endpoint, API_PREFIX, path)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%url, "GET");
        self.with_auth(self.http.get(url))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%url, "POST");
        self.with_auth(self.http.post(url))
    }

    /// Send a request, mapping transport failures to `ServiceError::Connection`.
    pub(crate) async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        request.send().await.map_err(|e| self.unreachable(e))
    }

    /// Decode a JSON body, or turn an error status into a `ServiceError`.
    ///
    /// `subject` names the resource for `NotFound` errors (kind, name).
    pub(crate) async fn decode<T: DeserializeOwned>(
        &self,
        response: Response,
        subject: (&'static str, &str),
    ) -> ServiceResult<T> {
        let status = response.status();
        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
            return Ok(serde_json::from_slice(&body)?);
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound {
                kind: subject.0,
                name: subject.1.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ServiceError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    fn unreachable(&self, err: reqwest::Error) -> ServiceError {
        ServiceError::Connection {
            endpoint: self.config.endpoint.clone(),
            reason: err.to_string(),
        }
    }
}

/// Extract the human-readable message from an API server error body.
///
/// The server answers errors as `{"error": ..., "message": ..., "code": ...}`;
/// anything else is passed through verbatim.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json["error"]
            .as_str()
            .or_else(|| json["message"].as_str())
            .unwrap_or(body)
            .to_string(),
        Err(_) => body.trim().to_string(),
    }
}
