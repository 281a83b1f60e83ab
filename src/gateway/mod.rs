//! Gateway collaborator interfaces.
//!
//! The crate never talks HTTP directly outside [`http`]. Everything else
//! depends on the two traits below, so tests and alternative transports can
//! supply their own implementation.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::ledger::query::QueryDescriptor;
use crate::reliability::is_retryable_status;

pub use http::HttpGateway;

/// Errors reported by a gateway collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Connection, timeout or other transport failure.
    #[error("request failed: {0}")]
    Transport(String),

    /// Gateway answered with a non-success status.
    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Transaction or payload does not exist (yet).
    #[error("transaction {0} not found")]
    NotFound(String),

    /// Body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::NotFound(_) | Self::Decode(_) => false,
        }
    }
}

/// Runs one transaction query and returns the raw JSON response.
///
/// A transport-level success whose body lacks the expected shape must be
/// returned as `Ok`; shape validation belongs to the caller.
#[async_trait]
pub trait QueryExecutor: Send + Sync + 'static {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Value, GatewayError>;
}

/// Fetches the raw data of a transaction as text.
#[async_trait]
pub trait PayloadFetcher: Send + Sync + 'static {
    async fn fetch_payload(&self, tx_id: &str) -> Result<String, GatewayError>;
}
