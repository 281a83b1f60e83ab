//! Cursor-driven pagination over the transactions query.
//!
//! Pages are requested strictly one after another: the cursor for page N+1
//! is the cursor of the last edge of page N. Transport errors are retried
//! through the shared [`RetryPolicy`]; a malformed page stops pagination at
//! once because it usually means the gateway contract changed.

use std::sync::Arc;
use tracing::{debug, warn};

use super::entry::{Entry, parse_page};
use super::query::{QueryBuilder, QueryFilter};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::gateway::{GatewayError, QueryExecutor};
use crate::reliability::{RetryPolicy, retry_async};

/// Result of a paginated fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Entries in page-concatenation order.
    pub entries: Vec<Entry>,
    /// False if pagination aborted or fewer than the desired entries arrived.
    pub succeeded: bool,
    /// Number of pages requested, including a final empty one.
    pub pages: usize,
}

/// Drives the query executor across pages.
#[derive(Clone)]
pub struct PaginatedFetcher {
    executor: Arc<dyn QueryExecutor>,
    page_size: usize,
    retry: RetryPolicy,
}

impl PaginatedFetcher {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            executor,
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch entries matching `filter`.
    ///
    /// With `desired = None` pagination runs until the ledger is exhausted
    /// (a short or empty page). With `Some(n)` it stops once `n` entries are
    /// collected and `succeeded` reports whether `n` was reached.
    pub async fn fetch(&self, filter: &QueryFilter, desired: Option<usize>) -> FetchOutcome {
        let mut entries: Vec<Entry> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        let mut aborted = false;

        if filter.is_unfiltered() {
            warn!("Query has no owner, id or tag filter; fetching unconstrained transactions");
        }

        loop {
            let requested = match desired {
                Some(target) => self.page_size.min(target.saturating_sub(entries.len())),
                None => self.page_size,
            };
            if requested == 0 {
                break;
            }

            let descriptor = match QueryBuilder::from_filter(filter.clone())
                .cursor(cursor.clone())
                .page_size(requested)
                .build()
            {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(error = %e, "Cannot build page query");
                    aborted = true;
                    break;
                },
            };

            let executor = &self.executor;
            let descriptor_ref = &descriptor;
            let response = retry_async(
                &self.retry,
                "transactions page",
                || async move { executor.execute(descriptor_ref).await },
                GatewayError::is_transient,
            )
            .await;
            pages += 1;

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    warn!(page = pages, fetched = entries.len(), error = %e, "Page request failed");
                    aborted = true;
                    break;
                },
            };

            let edges = match parse_page(&response) {
                Ok(edges) => edges,
                Err(reason) => {
                    warn!(page = pages, reason = %reason, "Malformed page, stopping pagination");
                    aborted = true;
                    break;
                },
            };

            let received = edges.len();
            debug!(page = pages, requested, received, "Fetched page");
            if received == 0 {
                break;
            }

            cursor = edges.last().map(|edge| edge.cursor.clone());
            entries.extend(edges.into_iter().map(|edge| edge.entry));

            match desired {
                Some(target) if entries.len() >= target => {
                    entries.truncate(target);
                    break;
                },
                None if received < requested => break,
                _ => {},
            }
        }

        let succeeded = !aborted && desired.is_none_or(|target| entries.len() >= target);
        FetchOutcome {
            entries,
            succeeded,
            pages,
        }
    }

    /// Look up a single transaction by id.
    ///
    /// # Errors
    ///
    /// Returns the gateway error once the retry policy is spent, or
    /// [`GatewayError::Decode`] for a malformed response.
    pub async fn fetch_by_id(&self, tx_id: &str) -> Result<Option<Entry>, GatewayError> {
        let descriptor = QueryBuilder::new()
            .id(tx_id)
            .page_size(1)
            .build()
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        let executor = &self.executor;
        let descriptor_ref = &descriptor;
        let response = retry_async(
            &self.retry,
            "transaction lookup",
            || async move { executor.execute(descriptor_ref).await },
            GatewayError::is_transient,
        )
        .await?;

        let edges = parse_page(&response).map_err(GatewayError::Decode)?;
        Ok(edges
            .into_iter()
            .map(|edge| edge.entry)
            .find(|entry| entry.id() == tx_id))
    }
}
