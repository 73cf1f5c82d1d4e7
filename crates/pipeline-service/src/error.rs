//! Error types for pipeline-service

use thiserror::Error;

/// Errors that can occur while talking to the pipeline service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The service could not be reached at all
    #[error("cannot reach pipeline service at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// A pipeline, run or experiment does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The service answered but refused the request (bad upload, name clash, ...)
    #[error("service rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// More than one pipeline is registered under the same name
    #[error("{count} pipelines are registered under the name '{name}'")]
    AmbiguousName { name: String, count: usize },

    /// The service returned something we could not interpret
    #[error("invalid response from pipeline service: {0}")]
    InvalidResponse(String),

    /// Local I/O failure (reading a pipeline package)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Shorthand for a missing pipeline.
    pub fn pipeline_not_found(name: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind: "pipeline",
            name: name.into(),
        }
    }

    /// Shorthand for a missing run.
    pub fn run_not_found(id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            kind: "run",
            name: id.into(),
        }
    }

    /// Whether this error means the whole service is unusable.
    pub fn is_connection(&self) -> bool {
        matches!(self, ServiceError::Connection { .. })
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_names_kind() {
        let err = ServiceError::pipeline_not_found("hello-pipeline");
        assert_eq!(err.to_string(), "pipeline not found: hello-pipeline");

        let err = ServiceError::run_not_found("run-1");
        assert!(err.to_string().starts_with("run not found"));
    }

    #[test]
    fn test_rejected_display_carries_status() {
        let err = ServiceError::Rejected {
            status: 409,
            message: "already exists".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("409"));
        assert!(msg.contains("already exists"));
        assert!(!err.is_connection());
    }

    #[test]
    fn test_connection_is_connection() {
        let err = ServiceError::Connection {
            endpoint: "http://localhost:8080".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.is_connection());
        assert!(err.to_string().contains("http://localhost:8080"));
    }
}
