//! Crate error types for typed error handling.
//!
//! Recoverable conditions (owner collisions, unknown tags, per-file
//! verification failures) never surface here: they are logged and recorded on
//! the entity or report instead. Only conditions that stop a whole operation
//! become an [`Error`].

use crate::gateway::GatewayError;
use crate::ledger::query::QueryError;

/// Result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that terminate an operation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Gateway call failed after the retry budget was spent.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// A query could not be built.
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    /// A required identifier was not supplied.
    #[error("missing required identifier: {0}")]
    MissingIdentifier(String),

    /// Pagination stopped before the result set was complete.
    #[error("incomplete fetch for {what}: gateway stopped after {fetched} entries")]
    IncompleteFetch { what: String, fetched: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a missing identifier error.
    pub fn missing_identifier(what: impl Into<String>) -> Self {
        Self::MissingIdentifier(what.into())
    }

    /// Create an incomplete fetch error.
    pub fn incomplete_fetch(what: impl Into<String>, fetched: usize) -> Self {
        Self::IncompleteFetch {
            what: what.into(),
            fetched,
        }
    }

    /// Whether a later retry of the whole command could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_transient(),
            Self::IncompleteFetch { .. } => true,
            Self::Query(_) | Self::MissingIdentifier(_) | Self::Config(_) | Self::Io { .. } => {
                false
            },
        }
    }
}
