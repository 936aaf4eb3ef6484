//! Azure provider error types

use sitestack_engine::EngineError;
use thiserror::Error;

/// Failures while building a service SAS
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SasError {
    #[error("Invalid account key: {0}")]
    InvalidAccountKey(String),

    #[error("Invalid timestamp '{0}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp(String),

    #[error("Invalid validity window: expiry {expiry} is not after start {start}")]
    InvalidWindow { start: String, expiry: String },

    #[error("Validity of {0} days ends past the latest representable date")]
    ExpiryOutOfRange(u32),

    #[error("Unsupported SAS {field} '{value}'")]
    Unsupported { field: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Invalid storage account name '{0}': 3-24 lowercase letters and digits")]
    InvalidAccountName(String),

    #[error("Invalid SKU: {0}")]
    InvalidSku(String),

    #[error("Invalid public access level: {0}")]
    InvalidPublicAccess(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid host name: {0}")]
    InvalidHostName(String),

    #[error("Record set {0} needs a target resource or record values")]
    EmptyRecordSet(String),

    #[error("Blob {0} has no source")]
    MissingSource(String),

    #[error("SAS error: {0}")]
    Sas(#[from] SasError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, AzureError>;

impl From<AzureError> for EngineError {
    fn from(error: AzureError) -> Self {
        match error {
            AzureError::Engine(inner) => inner,
            other => EngineError::ProviderError(other.to_string()),
        }
    }
}
