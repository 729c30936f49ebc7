//! Error taxonomy shared by the testhop crates.

use std::path::PathBuf;

/// Malformed runtime version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,

    #[error("invalid version {input:?}: {reason}")]
    Malformed { input: String, reason: String },
}

/// A test descriptor that could not be loaded. Fatal to that one test only.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed descriptor {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("descriptor {path:?} is missing required field `{field}`")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("descriptor {path:?} has an invalid version: {source}")]
    InvalidVersion {
        path: PathBuf,
        #[source]
        source: VersionError,
    },

    #[error("descriptor {path:?} has an empty name")]
    EmptyName { path: PathBuf },

    #[error("test name {name:?} does not match its directory {directory:?}")]
    NameMismatch { name: String, directory: String },
}

/// An inconsistency left behind by the operator or a previous run.
/// Aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error("stale feed configuration {path:?} already exists; remove it before running")]
    StaleFeedConfig { path: PathBuf },
}

/// Best-effort cleanup failure. Logged, never fatal.
#[derive(Debug, thiserror::Error)]
#[error("cannot remove {path:?}: {source}")]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors that terminate a run before it completes.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Operator(#[from] OperatorError),

    #[error("cannot walk test root {path:?}: {source}")]
    TestRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for descriptor loading.
pub type Result<T> = std::result::Result<T, DescriptorError>;
