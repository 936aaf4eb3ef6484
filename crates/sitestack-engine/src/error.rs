//! Engine error types

use thiserror::Error;

/// Errors raised while declaring, planning or applying resources
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("resource already declared: {0}")]
    DuplicateResource(String),

    #[error("invalid resource name '{0}'")]
    InvalidName(String),

    #[error("invalid type token '{0}', expected <package>:<module>:<Type>")]
    InvalidTypeToken(String),

    #[error("no provider registered for package '{0}'")]
    ProviderNotFound(String),

    #[error("provider '{provider}' does not support {token}")]
    UnsupportedResource { provider: String, token: String },

    #[error("invalid argument '{argument}' for {token}: {reason}")]
    InvalidArgument {
        token: String,
        argument: String,
        reason: String,
    },

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("state file error: {0}")]
    StateError(String),

    #[error("lock acquisition failed: {0}")]
    LockError(String),

    #[error(transparent)]
    Config(#[from] sitestack_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure carried by a deferred value.
///
/// Clonable so that every reader of an output observes the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    /// Not known until the resource is created (preview only)
    #[error("known after apply")]
    Unknown,

    #[error("upstream resource {urn} failed: {reason}")]
    Upstream { urn: String, reason: String },

    #[error("resource {0} was never resolved")]
    Abandoned(String),

    #[error("resource {urn} has no output '{attribute}'")]
    MissingAttribute { urn: String, attribute: String },

    #[error("expected {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("derived value failed: {0}")]
    Derivation(String),

    #[error("invoke {token} failed: {message}")]
    Invoke { token: String, message: String },
}

impl OutputError {
    pub fn derivation(message: impl Into<String>) -> Self {
        Self::Derivation(message.into())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The failure belongs to another resource rather than to the value
    /// being derived
    pub fn is_inherited(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Abandoned(_))
    }
}

pub type OutputResult<T> = std::result::Result<T, OutputError>;
