use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {message}")]
    IoError { path: PathBuf, message: String },

    #[error(
        "project root not found\nsearched from: {0}\nhint: run inside a directory containing stack.kdl or set SITESTACK_PROJECT_ROOT"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("stack '{stack}' is not defined (available: {available})")]
    StackNotFound { stack: String, available: String },

    #[error("no program selected for stack '{0}'; add `program \"<name>\"` to stack.kdl")]
    ProgramNotSet(String),

    #[error("missing required configuration value '{0}'")]
    MissingRequired(String),

    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid config override '{0}', expected key=value")]
    InvalidOverride(String),

    #[error("invalid stack file: {0}")]
    InvalidStackFile(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
