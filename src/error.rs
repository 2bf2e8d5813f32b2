//! Error types for the InfluxDB user reconciler

use serde::Serialize;
use thiserror::Error;

/// Result type alias using the reconciler's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types
#[derive(Error, Debug)]
pub enum Error {
    /// Required client capability is unavailable in this runtime
    #[error("Dependency missing: {0}")]
    DependencyMissing(String),

    /// Could not establish a session with the server
    #[error("Connection error: {0}")]
    Connection(String),

    /// A query or mutation was rejected by the server
    #[error("Remote operation '{operation}' failed: {message}")]
    RemoteOperation { operation: String, message: String },

    /// The user lookup matched more than one record
    #[error("Consistency error: {count} users named '{name}' found")]
    Consistency { name: String, count: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A later action failed after earlier ones reached the server
    #[error("{source} (already applied: {})", applied.join(", "))]
    PartiallyApplied {
        applied: Vec<&'static str>,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification reported alongside failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DependencyMissing,
    ConnectionError,
    RemoteOperationError,
    ConsistencyError,
    ConfigError,
    IoError,
}

impl ErrorKind {
    /// Whether a call to the server was attempted before the failure
    pub fn attempted(self) -> bool {
        !matches!(
            self,
            ErrorKind::DependencyMissing | ErrorKind::ConfigError | ErrorKind::IoError
        )
    }
}

impl Error {
    /// Create a dependency-missing error
    pub fn dependency_missing(msg: impl Into<String>) -> Self {
        Error::DependencyMissing(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a remote operation error
    pub fn remote(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::RemoteOperation {
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether the server was modified before the run failed
    pub fn changed(&self) -> bool {
        matches!(self, Error::PartiallyApplied { applied, .. } if !applied.is_empty())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DependencyMissing(_) => ErrorKind::DependencyMissing,
            Error::Connection(_) => ErrorKind::ConnectionError,
            Error::RemoteOperation { .. } | Error::Serialization(_) => {
                ErrorKind::RemoteOperationError
            }
            Error::Consistency { .. } => ErrorKind::ConsistencyError,
            Error::Config(_) | Error::Yaml(_) => ErrorKind::ConfigError,
            Error::Io(_) => ErrorKind::IoError,
            Error::PartiallyApplied { source, .. } => source.kind(),
        }
    }
}
