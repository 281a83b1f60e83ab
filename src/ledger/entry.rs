//! Normalized view of a single ledger transaction.
//!
//! Gateway edges are decoded into [`Entry`] values once and never mutated
//! afterwards. Consumers that need ordering go through [`Confirmation`], which
//! keeps pending transactions out of any height comparison.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::utils::winston_to_ar;

/// A name/value annotation attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fee or transferred value in both winston and AR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Amount {
    pub winston: u128,
    pub ar: String,
}

impl Amount {
    pub fn from_winston(winston: u128) -> Self {
        Self {
            winston,
            ar: winston_to_ar(winston),
        }
    }
}

/// Whether a transaction has been included in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Confirmation {
    Confirmed { height: u64, timestamp: Option<i64> },
    Pending,
}

impl Confirmation {
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Chronological sort key. Pending transactions sort after every
    /// confirmed one and compare equal to each other.
    pub const fn sort_key(&self) -> (u8, u64) {
        match self {
            Self::Confirmed { height, .. } => (0, *height),
            Self::Pending => (1, 0),
        }
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed { height, .. } => write!(f, "confirmed (block {height})"),
            Self::Pending => f.write_str("pending"),
        }
    }
}

/// One ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    id: String,
    owner: String,
    block_height: Option<u64>,
    block_timestamp: Option<i64>,
    tags: Vec<Tag>,
    fee: Amount,
    quantity: Amount,
    data_size: u64,
    data_type: Option<String>,
    recipient: Option<String>,
}

impl Entry {
    /// Create a pending entry with no tags and zero amounts.
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            block_height: None,
            block_timestamp: None,
            tags: Vec::new(),
            fee: Amount::default(),
            quantity: Amount::default(),
            data_size: 0,
            data_type: None,
            recipient: None,
        }
    }

    #[must_use]
    pub fn at_block(mut self, height: u64, timestamp: i64) -> Self {
        self.block_height = Some(height);
        self.block_timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    #[must_use]
    pub fn with_fee(mut self, winston: u128) -> Self {
        self.fee = Amount::from_winston(winston);
        self
    }

    #[must_use]
    pub fn with_quantity(mut self, winston: u128) -> Self {
        self.quantity = Amount::from_winston(winston);
        self
    }

    #[must_use]
    pub fn with_data(mut self, size: u64, data_type: Option<String>) -> Self {
        self.data_size = size;
        self.data_type = data_type;
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        let recipient = recipient.into();
        self.recipient = (!recipient.is_empty()).then_some(recipient);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn block_height(&self) -> Option<u64> {
        self.block_height
    }

    pub fn block_timestamp(&self) -> Option<i64> {
        self.block_timestamp
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn fee(&self) -> &Amount {
        &self.fee
    }

    pub fn quantity(&self) -> &Amount {
        &self.quantity
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn data_type(&self) -> Option<&str> {
        self.data_type.as_deref()
    }

    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }

    pub fn confirmation(&self) -> Confirmation {
        match self.block_height {
            Some(height) => Confirmation::Confirmed {
                height,
                timestamp: self.block_timestamp,
            },
            None => Confirmation::Pending,
        }
    }
}

/// An [`Entry`] together with its pagination cursor.
#[derive(Debug, Clone)]
pub struct Edge {
    pub cursor: String,
    pub entry: Entry,
}

/// Decode the edge list of a `transactions` query response.
///
/// Returns `Err` with a reason when the response does not have the expected
/// shape (no `data.transactions.edges` array, or an edge without a node id).
pub fn parse_page(response: &Value) -> Result<Vec<Edge>, String> {
    if let Some(errors) = response.get("errors")
        && response.pointer("/data/transactions").is_none()
    {
        return Err(format!("gateway reported errors: {errors}"));
    }

    let edges = response
        .pointer("/data/transactions/edges")
        .and_then(Value::as_array)
        .ok_or_else(|| "response has no data.transactions.edges array".to_string())?;

    edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            serde_json::from_value::<RawEdge>(edge.clone())
                .map(RawEdge::into_edge)
                .map_err(|e| format!("edge {i}: {e}"))
        })
        .collect()
}

#[derive(Deserialize)]
struct RawEdge {
    cursor: String,
    node: RawNode,
}

#[derive(Deserialize)]
struct RawNode {
    id: String,
    owner: RawOwner,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    fee: Option<RawAmount>,
    #[serde(default)]
    quantity: Option<RawAmount>,
    #[serde(default)]
    data: Option<RawData>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    block: Option<RawBlock>,
}

#[derive(Deserialize)]
struct RawOwner {
    address: String,
}

#[derive(Deserialize)]
struct RawAmount {
    #[serde(deserialize_with = "lenient_u128")]
    winston: u128,
}

#[derive(Deserialize)]
struct RawData {
    #[serde(deserialize_with = "lenient_u128")]
    size: u128,
    #[serde(default, rename = "type")]
    data_type: Option<String>,
}

#[derive(Deserialize)]
struct RawBlock {
    height: u64,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl RawEdge {
    fn into_edge(self) -> Edge {
        let node = self.node;
        let (data_size, data_type) = node
            .data
            .map(|d| (u64::try_from(d.size).unwrap_or(u64::MAX), d.data_type))
            .unwrap_or_default();
        Edge {
            cursor: self.cursor,
            entry: Entry {
                id: node.id,
                owner: node.owner.address,
                block_height: node.block.as_ref().map(|b| b.height),
                block_timestamp: node.block.and_then(|b| b.timestamp),
                tags: node.tags,
                fee: Amount::from_winston(node.fee.map_or(0, |a| a.winston)),
                quantity: Amount::from_winston(node.quantity.map_or(0, |a| a.winston)),
                data_size,
                data_type: data_type.filter(|t| !t.is_empty()),
                recipient: node.recipient.filter(|r| !r.is_empty()),
            },
        }
    }
}

/// Gateways send numeric fields either as JSON numbers or decimal strings.
fn lenient_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| D::Error::custom(format!("not an unsigned integer: {n}"))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s
            .parse()
            .map_err(|_| D::Error::custom(format!("not an unsigned integer: {s:?}"))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("unexpected value: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> Value {
        json!({
            "data": {
                "transactions": {
                    "pageInfo": { "hasNextPage": false },
                    "edges": [
                        {
                            "cursor": "c1",
                            "node": {
                                "id": "tx-1",
                                "owner": { "address": "alice" },
                                "recipient": "",
                                "fee": { "winston": "1500000000000", "ar": "1.500000000000" },
                                "quantity": { "winston": "0", "ar": "0.000000000000" },
                                "data": { "size": "512", "type": "application/json" },
                                "tags": [
                                    { "name": "Entity-Type", "value": "file" },
                                    { "name": "File-Id", "value": "f-1" },
                                    { "name": "File-Id", "value": "f-2" }
                                ],
                                "block": { "height": 100, "timestamp": 1700000000 }
                            }
                        },
                        {
                            "cursor": "c2",
                            "node": {
                                "id": "tx-2",
                                "owner": { "address": "bob" },
                                "tags": [],
                                "block": null
                            }
                        }
                    ]
                }
            }
        })
    }

    #[test]
    fn test_parse_page_decodes_edges() {
        let edges = parse_page(&sample_response()).unwrap();
        assert_eq!(edges.len(), 2);

        let first = &edges[0].entry;
        assert_eq!(edges[0].cursor, "c1");
        assert_eq!(first.id(), "tx-1");
        assert_eq!(first.owner(), "alice");
        assert_eq!(first.block_height(), Some(100));
        assert_eq!(first.fee().winston, 1_500_000_000_000);
        assert_eq!(first.fee().ar, "1.500000000000");
        assert_eq!(first.data_size(), 512);
        assert_eq!(first.data_type(), Some("application/json"));
        assert_eq!(first.recipient(), None);

        let second = &edges[1].entry;
        assert_eq!(second.confirmation(), Confirmation::Pending);
        assert_eq!(second.data_size(), 0);
    }

    #[test]
    fn test_duplicate_tags_preserved_first_wins() {
        let edges = parse_page(&sample_response()).unwrap();
        let entry = &edges[0].entry;
        assert_eq!(entry.tags().len(), 3);
        assert_eq!(entry.tag("File-Id"), Some("f-1"));
        assert_eq!(entry.tag("Missing"), None);
    }

    #[test]
    fn test_parse_page_rejects_missing_edges() {
        let err = parse_page(&json!({ "data": { "transactions": {} } })).unwrap_err();
        assert!(err.contains("edges"));

        let err = parse_page(&json!({ "errors": [{ "message": "boom" }] })).unwrap_err();
        assert!(err.contains("boom"));
    }

    #[test]
    fn test_parse_page_rejects_edge_without_id() {
        let response = json!({
            "data": { "transactions": { "edges": [
                { "cursor": "c1", "node": { "owner": { "address": "a" } } }
            ] } }
        });
        let err = parse_page(&response).unwrap_err();
        assert!(err.starts_with("edge 0"));
    }

    #[test]
    fn test_pending_sorts_after_confirmed() {
        let confirmed = Entry::new("a", "o").at_block(10, 0).confirmation();
        let later = Entry::new("b", "o").at_block(11, 0).confirmation();
        let pending = Entry::new("c", "o").confirmation();

        assert!(confirmed.sort_key() < later.sort_key());
        assert!(later.sort_key() < pending.sort_key());
        assert!(!pending.is_confirmed());
        assert_eq!(pending.to_string(), "pending");
        assert_eq!(confirmed.to_string(), "confirmed (block 10)");
    }
}
