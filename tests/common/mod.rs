//! In-memory ledger shared by the integration tests.
//!
//! `MockLedger` implements both gateway traits. It evaluates the typed
//! filter of each query against its entries, sorts them the way the gateway
//! does (confirmed by height, pending last) and pages through them using the
//! entry's position as the cursor.

#![allow(dead_code)]

use arscan::gateway::{GatewayError, PayloadFetcher, QueryExecutor};
use arscan::ledger::{Entry, QueryDescriptor, QueryFilter, SortOrder};
use arscan::reliability::RetryPolicy;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct MockLedger {
    entries: Vec<Entry>,
    payloads: HashMap<String, String>,
    /// Transactions visible to id lookups but absent from filtered searches.
    unlisted: HashSet<String>,
    /// Query calls (1-based) answered with a transient error.
    failing_calls: HashSet<usize>,
    /// Query calls (1-based) answered with a malformed body.
    malformed_calls: HashSet<usize>,
    /// Time a payload takes to arrive.
    payload_delays: HashMap<String, Duration>,
    queries: AtomicUsize,
    payload_requests: Mutex<Vec<String>>,
    requested_sizes: Mutex<Vec<usize>>,
}

impl MockLedger {
    pub fn builder() -> MockLedgerBuilder {
        MockLedgerBuilder::default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Page sizes requested by filtered queries, in call order.
    pub fn requested_sizes(&self) -> Vec<usize> {
        self.requested_sizes.lock().unwrap().clone()
    }

    pub fn payload_requests(&self) -> Vec<String> {
        self.payload_requests.lock().unwrap().clone()
    }

    /// How many times the payload of `tx_id` was requested.
    pub fn payload_attempts(&self, tx_id: &str) -> usize {
        self.payload_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == tx_id)
            .count()
    }

    fn select(&self, filter: &QueryFilter) -> Vec<&Entry> {
        let by_id = !filter.ids.is_empty();
        let mut selected: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| by_id || !self.unlisted.contains(e.id()))
            .filter(|e| matches_filter(e, filter))
            .collect();
        selected.sort_by_key(|e| e.confirmation().sort_key());
        if filter.sort == SortOrder::NewestFirst {
            selected.reverse();
        }
        selected
    }
}

fn matches_filter(entry: &Entry, filter: &QueryFilter) -> bool {
    (filter.owners.is_empty() || filter.owners.iter().any(|o| o == entry.owner()))
        && (filter.ids.is_empty() || filter.ids.iter().any(|id| id == entry.id()))
        && filter.tags.iter().all(|tf| {
            entry
                .tags()
                .iter()
                .any(|tag| tf.matches(&tag.name, &tag.value))
        })
}

fn edge_json(cursor: usize, entry: &Entry) -> Value {
    let block = entry
        .block_height()
        .map(|height| json!({ "height": height, "timestamp": entry.block_timestamp() }));
    json!({
        "cursor": cursor.to_string(),
        "node": {
            "id": entry.id(),
            "owner": { "address": entry.owner() },
            "recipient": entry.recipient().unwrap_or(""),
            "fee": { "winston": entry.fee().winston.to_string(), "ar": entry.fee().ar },
            "quantity": { "winston": entry.quantity().winston.to_string(), "ar": entry.quantity().ar },
            "data": { "size": entry.data_size().to_string(), "type": entry.data_type() },
            "tags": entry.tags(),
            "block": block,
        }
    })
}

#[async_trait]
impl QueryExecutor for MockLedger {
    async fn execute(&self, query: &QueryDescriptor) -> Result<Value, GatewayError> {
        let call = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_calls.contains(&call) {
            return Err(GatewayError::Status {
                status: 503,
                body: "busy".to_string(),
            });
        }
        if self.malformed_calls.contains(&call) {
            return Ok(json!({ "data": { "transactions": null } }));
        }
        if query.filter().ids.is_empty() {
            self.requested_sizes.lock().unwrap().push(query.first());
        }

        let start = query
            .cursor()
            .and_then(|c| c.parse::<usize>().ok())
            .map_or(0, |c| c + 1);
        let edges: Vec<Value> = self
            .select(query.filter())
            .into_iter()
            .enumerate()
            .skip(start)
            .take(query.first())
            .map(|(i, entry)| edge_json(i, entry))
            .collect();

        Ok(json!({ "data": { "transactions": { "edges": edges } } }))
    }
}

#[async_trait]
impl PayloadFetcher for MockLedger {
    async fn fetch_payload(&self, tx_id: &str) -> Result<String, GatewayError> {
        self.payload_requests.lock().unwrap().push(tx_id.to_string());
        if let Some(delay) = self.payload_delays.get(tx_id) {
            tokio::time::sleep(*delay).await;
        }
        self.payloads
            .get(tx_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(tx_id.to_string()))
    }
}

#[derive(Default)]
pub struct MockLedgerBuilder {
    ledger: MockLedger,
}

impl MockLedgerBuilder {
    pub fn entry(mut self, entry: Entry) -> Self {
        self.ledger.entries.push(entry);
        self
    }

    pub fn payload(mut self, tx_id: &str, body: &str) -> Self {
        self.ledger
            .payloads
            .insert(tx_id.to_string(), body.to_string());
        self
    }

    pub fn payload_delay(mut self, tx_id: &str, delay: Duration) -> Self {
        self.ledger.payload_delays.insert(tx_id.to_string(), delay);
        self
    }

    pub fn unlisted(mut self, entry: Entry) -> Self {
        self.ledger.unlisted.insert(entry.id().to_string());
        self.ledger.entries.push(entry);
        self
    }

    pub fn fail_call(mut self, call: usize) -> Self {
        self.ledger.failing_calls.insert(call);
        self
    }

    pub fn malformed_call(mut self, call: usize) -> Self {
        self.ledger.malformed_calls.insert(call);
        self
    }

    pub fn build(self) -> MockLedger {
        self.ledger
    }
}

/// Retry policy with millisecond delays so tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(3)
        .with_initial_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(2))
        .without_jitter()
}

// =============================================================================
// Entry helpers
// =============================================================================

pub const ALICE: &str = "alice-address";
pub const MALLORY: &str = "mallory-address";

pub fn drive_tx(id: &str, drive_id: &str, owner: &str, height: u64) -> Entry {
    Entry::new(id, owner)
        .at_block(height, 1_700_000_000 + height as i64)
        .with_tag("ArFS", "0.11")
        .with_tag("Entity-Type", "drive")
        .with_tag("Drive-Id", drive_id)
        .with_tag("Drive-Privacy", "public")
}

pub fn folder_tx(id: &str, drive_id: &str, folder_id: &str, owner: &str, height: u64) -> Entry {
    Entry::new(id, owner)
        .at_block(height, 1_700_000_000 + height as i64)
        .with_tag("ArFS", "0.11")
        .with_tag("Entity-Type", "folder")
        .with_tag("Drive-Id", drive_id)
        .with_tag("Folder-Id", folder_id)
}

pub fn file_tx(id: &str, drive_id: &str, file_id: &str, owner: &str, height: Option<u64>) -> Entry {
    let entry = Entry::new(id, owner)
        .with_tag("ArFS", "0.11")
        .with_tag("Entity-Type", "file")
        .with_tag("Drive-Id", drive_id)
        .with_tag("File-Id", file_id)
        .with_tag("Parent-Folder-Id", "root-folder");
    match height {
        Some(h) => entry.at_block(h, 1_700_000_000 + h as i64),
        None => entry,
    }
}

pub fn data_tx(id: &str, owner: &str, height: Option<u64>) -> Entry {
    let entry = Entry::new(id, owner).with_data(1024, Some("image/png".to_string()));
    match height {
        Some(h) => entry.at_block(h, 1_700_000_000 + h as i64),
        None => entry,
    }
}

pub fn file_payload(name: &str, data_tx_id: &str) -> String {
    json!({
        "name": name,
        "size": 1024,
        "lastModifiedDate": 1_700_000_000_000_i64,
        "dataTxId": data_tx_id,
        "dataContentType": "image/png",
    })
    .to_string()
}
