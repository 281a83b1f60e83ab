//! Finding an entity's canonical owner and its transactions.

use tracing::{debug, error, info};

use super::entity::Entity;
use super::tags::{EntityKind, KnownTag};
use crate::error::{Error, Result};
use crate::ledger::{PaginatedFetcher, QueryFilter, SortOrder};

/// Resolves entity ids to owner-scoped [`Entity`] values.
#[derive(Clone)]
pub struct EntityResolver {
    fetcher: PaginatedFetcher,
}

impl EntityResolver {
    pub fn new(fetcher: PaginatedFetcher) -> Self {
        Self { fetcher }
    }

    /// Filter selecting every transaction of one entity, oldest first.
    pub fn entity_filter(entity_id: &str, kind: EntityKind) -> QueryFilter {
        QueryFilter::new()
            .tag(KnownTag::EntityType.name(), kind.as_tag_value())
            .tag(kind.id_tag().name(), entity_id)
            .sort(SortOrder::OldestFirst)
    }

    /// Resolve `entity_id`.
    ///
    /// Returns `Ok(None)` when the ledger has no transaction for it.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty id, or when pagination stopped early so
    /// the transaction set would be incomplete.
    pub async fn resolve(&self, entity_id: &str, kind: EntityKind) -> Result<Option<Entity>> {
        let entity_id = entity_id.trim();
        if entity_id.is_empty() {
            return Err(Error::missing_identifier(format!("{kind} id")));
        }

        let outcome = self
            .fetcher
            .fetch(&Self::entity_filter(entity_id, kind), None)
            .await;
        if !outcome.succeeded {
            return Err(Error::incomplete_fetch(
                format!("{kind} {entity_id}"),
                outcome.entries.len(),
            ));
        }
        if outcome.entries.is_empty() {
            debug!(entity_id = %entity_id, kind = %kind, "No transactions found");
            return Ok(None);
        }

        let total = outcome.entries.len();
        let Some(entity) = Entity::from_entries(kind, entity_id, outcome.entries) else {
            error!(entity_id = %entity_id, "Resolved owner has no operations");
            return Ok(None);
        };

        info!(
            entity_id = %entity_id,
            kind = %kind,
            owner = %entity.owner,
            operations = entity.operations(),
            excluded = total - entity.operations(),
            "Resolved entity"
        );
        Ok(Some(entity))
    }
}
