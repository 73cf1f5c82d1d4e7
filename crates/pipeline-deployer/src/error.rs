//! Error taxonomy for deployment and catalog scanning.

use std::path::PathBuf;

use pipeline_service::ServiceError;

/// Errors produced while scanning for compiled pipeline definitions.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("directory '{}' does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced while deploying a single pipeline file.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The service did not accept the pipeline or version upload.
    #[error("upload of pipeline '{pipeline}' failed: {source}")]
    Upload {
        pipeline: String,
        #[source]
        source: ServiceError,
    },

    /// The path does not name a recognised pipeline definition.
    #[error("not a pipeline definition: {}", .0.display())]
    InvalidArtifact(PathBuf),
}

impl DeployError {
    /// Whether the underlying cause is loss of connectivity to the service.
    pub fn is_connection(&self) -> bool {
        matches!(self, DeployError::Upload { source, .. } if source.is_connection())
    }
}

/// Result type for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;
