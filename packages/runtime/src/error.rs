//! Error types for the client runtime.

use std::fmt;
use std::sync::Arc;

/// Broad class of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid in-memory operation. Raised synchronously, never retried.
    LocalUsage,
    /// The request never produced a response.
    Transport,
    /// The service answered with a structured error.
    RemoteProtocol,
}

/// A structured error returned by the service for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "HTTP {} ({}): {}", self.status, code, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// One failed query inside an execution cycle.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    /// Position of the query in submission order.
    pub index: usize,
    pub description: String,
    pub error: Error,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}: {}", self.index, self.description, self.error)
    }
}

/// Errors raised by the runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("unknown property '{property}' on {entity_type}")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    #[error("property '{property}' on {entity_type} is {actual}, not {expected}")]
    PropertyKindMismatch {
        entity_type: String,
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("property '{property}' on {entity_type} is a navigation property and cannot be set")]
    ReadOnlyProperty {
        entity_type: String,
        property: String,
    },

    #[error("expected a collection of {expected}, found {actual}")]
    SchemaMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("malformed value for '{property}': {message}")]
    MalformedProperty { property: String, message: String },

    #[error("collection of {entity_type} has not been loaded; execute a read query before iterating")]
    CollectionNotLoaded { entity_type: String },

    #[error("{entity_type} has no resource path yet")]
    NotAddressable { entity_type: String },

    #[error("result of '{operation}' has not been resolved")]
    ResultNotResolved { operation: String },

    #[error("a batch is already executing on this context")]
    ExecutionInProgress,

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("transport error: {0}")]
    Transport(Arc<o365_http::Error>),

    /// Query was never sent because an earlier request in the same cycle
    /// failed at the transport level.
    #[error("not sent: {reason}")]
    Aborted { reason: String },

    #[error("remote error: {0}")]
    Remote(RemoteError),

    #[error("{} of {} queries failed; first: {}", .failures.len(), .total, first_failure(.failures))]
    Batch {
        total: usize,
        failures: Vec<QueryFailure>,
    },
}

fn first_failure(failures: &[QueryFailure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) | Error::Aborted { .. } => ErrorKind::Transport,
            Error::Remote(_) => ErrorKind::RemoteProtocol,
            Error::Batch { failures, .. } => {
                // A batch is as severe as its worst member.
                if failures
                    .iter()
                    .any(|f| f.error.kind() == ErrorKind::Transport)
                {
                    ErrorKind::Transport
                } else if failures
                    .iter()
                    .any(|f| f.error.kind() == ErrorKind::RemoteProtocol)
                {
                    ErrorKind::RemoteProtocol
                } else {
                    ErrorKind::LocalUsage
                }
            }
            _ => ErrorKind::LocalUsage,
        }
    }

    /// Failed queries of an execution cycle, empty for other errors.
    pub fn failures(&self) -> &[QueryFailure] {
        match self {
            Error::Batch { failures, .. } => failures,
            _ => &[],
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Error::Remote(remote) => Some(remote),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(Arc::new(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<o365_http::Error> for Error {
    fn from(e: o365_http::Error) -> Self {
        Error::Transport(Arc::new(e))
    }
}

impl From<RemoteError> for Error {
    fn from(e: RemoteError) -> Self {
        Error::Remote(e)
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
