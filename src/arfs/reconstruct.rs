//! Folding an entity's transactions into current state and history.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::entity::{DataVersion, Entity, EntityInfo};
use super::payload::{MetadataPayload, PayloadError};
use crate::gateway::{GatewayError, PayloadFetcher};
use crate::ledger::{Entry, PaginatedFetcher};
use crate::reliability::retry_async;

/// Replays an entity's transactions in chronological order.
///
/// The only path that updates `entity.info` is reaching the entity's
/// `latest_tx` during the replay, or the single-transaction refresh that
/// runs when the replay never reaches it.
#[derive(Clone)]
pub struct StateReconstructor {
    fetcher: PaginatedFetcher,
    payloads: Arc<dyn PayloadFetcher>,
}

impl StateReconstructor {
    pub fn new(fetcher: PaginatedFetcher, payloads: Arc<dyn PayloadFetcher>) -> Self {
        Self { fetcher, payloads }
    }

    /// Rebuild `entity.info`, `entity.history` and `entity.versions`.
    ///
    /// Problems are recorded in `entity.errors`; nothing is returned.
    /// Running it again over the same entity leaves history unchanged.
    pub async fn reconstruct(&self, entity: &mut Entity) {
        let mut order: Vec<usize> = (0..entity.operations()).collect();
        order.sort_by_key(|&i| entity.entries()[i].confirmation().sort_key());

        let mut seen_data: HashSet<String> = entity
            .versions
            .iter()
            .map(|v| v.data_tx_id.clone())
            .collect();
        let mut previous: Option<EntityInfo> = None;
        let mut updated = false;

        for i in order {
            let entry = entity.entries()[i].clone();
            let state = self.derive_state(entity, &entry).await;

            let description = if entry.id() == entity.creation_tx {
                describe("created", &state.tracked_fields_text())
            } else {
                let changes = previous
                    .as_ref()
                    .map(|prev| state.changes_since(prev))
                    .unwrap_or_else(|| state.tracked_fields_text());
                if changes.is_empty() {
                    "modified [no tracked changes]".to_string()
                } else {
                    describe("modified", &changes)
                }
            };
            entity.history.record(entry.id(), description);

            if let Some(data_tx) = &state.data_tx_id
                && seen_data.insert(data_tx.clone())
            {
                entity.versions.push(DataVersion {
                    data_tx_id: data_tx.clone(),
                    metadata_tx_id: entry.id().to_string(),
                    name: state.name.clone(),
                    size: state.size,
                    confirmation: entry.confirmation().to_string(),
                });
            }

            if entry.id() == entity.latest_tx {
                entity.info = state.clone();
                updated = true;
            }
            previous = Some(state);
        }

        if !updated {
            warn!(
                entity_id = %entity.id,
                latest_tx = %entity.latest_tx,
                "Internal inconsistency: replay never reached the latest transaction, refreshing directly"
            );
            self.refresh_latest(entity).await;
        }
    }

    /// Recompute `entity.info` from the latest transaction alone.
    pub async fn refresh_latest(&self, entity: &mut Entity) {
        let latest = match entity.entry(&entity.latest_tx).cloned() {
            Some(entry) => Some(entry),
            None => match self.fetcher.fetch_by_id(&entity.latest_tx).await {
                Ok(found) => found,
                Err(e) => {
                    entity
                        .errors
                        .push(format!("refresh of {} failed: {e}", entity.latest_tx));
                    return;
                },
            },
        };

        match latest {
            Some(entry) => entity.info = self.derive_state(entity, &entry).await,
            None => entity.errors.push(format!(
                "latest transaction {} not found on the gateway",
                entity.latest_tx
            )),
        }
    }

    /// Tag- and payload-derived state for one transaction.
    async fn derive_state(&self, entity: &mut Entity, entry: &Entry) -> EntityInfo {
        let mut state = EntityInfo::from_entry(entry);
        if let Some(payload) = self.payload_for(entity, entry, state.privacy.is_private()).await {
            state.apply_payload(&payload);
            for field in &state.unknown_fields {
                warn!(tx_id = %entry.id(), field = %field, "Ignoring unknown metadata field");
            }
        }
        state
    }

    /// Cached payload fetch. Private entities are never fetched.
    async fn payload_for(
        &self,
        entity: &mut Entity,
        entry: &Entry,
        private: bool,
    ) -> Option<MetadataPayload> {
        if let Some(cached) = entity.cached_payload(entry.id()) {
            return cached.cloned();
        }
        if private {
            debug!(tx_id = %entry.id(), "Skipping payload of private entity");
            entity.cache_payload(entry.id(), None);
            return None;
        }

        let payloads = &self.payloads;
        let tx_id = entry.id();
        let fetched = retry_async(
            self.fetcher.retry_policy(),
            "entity metadata",
            || async move { payloads.fetch_payload(tx_id).await },
            GatewayError::is_transient,
        )
        .await
        .map_err(PayloadError::from)
        .and_then(|text| MetadataPayload::parse(&text).map_err(PayloadError::from));

        let payload = match fetched {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(tx_id = %tx_id, error = %e, "Metadata unavailable");
                entity.errors.push(format!("{tx_id}: {e}"));
                None
            },
        };
        entity.cache_payload(tx_id, payload.clone());
        payload
    }
}

impl EntityInfo {
    fn tracked_fields_text(&self) -> Vec<String> {
        self.tracked_fields()
            .into_iter()
            .map(|(label, value)| format!("{label}={value}"))
            .collect()
    }
}

fn describe(verb: &str, parts: &[String]) -> String {
    format!("{verb} [{}]", parts.join(", "))
}
