//! AWS provider error types

use sitestack_engine::EngineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid canned ACL: {0}")]
    InvalidAcl(String),

    #[error("Hosted zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    #[error("Record {0} needs either records or an alias")]
    EmptyRecord(String),

    #[error("Certificate {arn} is in {region}; CloudFront requires us-east-1")]
    CertificateRegion { arn: String, region: String },

    #[error("Cache behavior targets unknown origin: {0}")]
    UnknownOrigin(String),

    #[error("Invalid validation method: {0}")]
    InvalidValidationMethod(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, AwsError>;

impl From<AwsError> for EngineError {
    fn from(error: AwsError) -> Self {
        match error {
            AwsError::Engine(inner) => inner,
            other => EngineError::ProviderError(other.to_string()),
        }
    }
}
