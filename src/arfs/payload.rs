//! JSON metadata payloads of ArFS transactions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gateway::GatewayError;

/// Parsed metadata payload.
///
/// Only the fields the crate interprets are typed; everything else is kept in
/// `extra` so callers can report it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified_date: Option<i64>,
    #[serde(default)]
    pub data_tx_id: Option<String>,
    #[serde(default)]
    pub data_content_type: Option<String>,
    #[serde(default)]
    pub root_folder_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataPayload {
    /// Parse a payload body.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a JSON object or a known field has
    /// the wrong type.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Names of fields outside the recognized set, sorted.
    pub fn unknown_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.extra.keys().cloned().collect();
        fields.sort();
        fields
    }
}

/// Failure to obtain a usable payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("could not fetch metadata: {0}")]
    Fetch(#[from] GatewayError),

    #[error("could not parse metadata: {0}")]
    Parse(#[from] serde_json::Error),
}
