//! ArFS entity model: tags, payloads, ownership resolution and state replay.

pub mod entity;
pub mod payload;
pub mod reconstruct;
pub mod resolver;
pub mod tags;

pub use entity::{DataVersion, Entity, EntityInfo, History, HistoryLine};
pub use payload::{MetadataPayload, PayloadError};
pub use reconstruct::StateReconstructor;
pub use resolver::EntityResolver;
pub use tags::{EntityKind, KnownTag, Privacy};
