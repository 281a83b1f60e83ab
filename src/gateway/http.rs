//! HTTP implementation of the gateway traits.
//!
//! Queries are POSTed to `<base>/graphql`; payloads are read from
//! `<base>/<tx id>`.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{GatewayError, PayloadFetcher, QueryExecutor};
use crate::ledger::query::QueryDescriptor;

/// Longest error body kept in a [`GatewayError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Gateway client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a client for the gateway at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL or the HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| GatewayError::Transport(format!("invalid gateway URL {base_url}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(GatewayError::Transport(format!(
                "unsupported gateway scheme: {}",
                base.scheme()
            )));
        }
        // Url::join replaces the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path)
            .map_err(|e| GatewayError::Transport(format!("invalid gateway path {path}: {e}")))
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            Self::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            Self::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl QueryExecutor for HttpGateway {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Value, GatewayError> {
        let url = self.endpoint("graphql")?;
        debug!(
            url = %url,
            first = query.first(),
            cursor = query.cursor().unwrap_or(""),
            "Executing transactions query"
        );

        let response = self
            .client
            .post(url)
            .json(&query.to_request_body())
            .send()
            .await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl PayloadFetcher for HttpGateway {
    async fn fetch_payload(&self, tx_id: &str) -> Result<String, GatewayError> {
        let url = self.endpoint(tx_id)?;
        debug!(url = %url, "Fetching transaction payload");

        let response = self.client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(tx_id.to_string()));
        }
        let response = Self::check_status(response).await?;
        Ok(response.text().await?)
    }
}
