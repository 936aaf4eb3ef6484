//! GCP provider error types

use sitestack_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GcpError {
    #[error("Invalid bucket location: {0}")]
    InvalidLocation(String),

    #[error("Invalid bucket name '{0}': 3-63 lowercase letters, digits, dashes and dots")]
    InvalidBucketName(String),

    #[error("Invalid IAM role: {0}")]
    InvalidRole(String),

    #[error("Invalid IAM member: {0}")]
    InvalidMember(String),

    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("Invalid port range: {0}")]
    InvalidPortRange(String),

    #[error("Invalid IP address: {0}")]
    InvalidAddress(String),

    #[error("Not a compute self link: {0}")]
    InvalidSelfLink(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, GcpError>;

impl From<GcpError> for EngineError {
    fn from(error: GcpError) -> Self {
        match error {
            GcpError::Engine(inner) => inner,
            other => EngineError::ProviderError(other.to_string()),
        }
    }
}
