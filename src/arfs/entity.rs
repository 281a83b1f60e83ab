//! Reconstructed ArFS entities.
//!
//! An [`Entity`] owns the owner-scoped transactions it was built from; it
//! holds no reference back to the query that produced them. Its `info`
//! snapshot and `history` are filled in by
//! [`StateReconstructor`](super::reconstruct::StateReconstructor).

use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, warn};

use super::payload::MetadataPayload;
use super::tags::{EntityKind, KnownTag, Privacy};
use crate::ledger::{Confirmation, Entry, Tag};
use crate::utils::{format_bytes, format_millis};

/// Point-in-time state of an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityInfo {
    /// Transaction this state was derived from.
    pub tx_id: Option<String>,
    pub confirmation: Option<Confirmation>,

    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub app_platform: Option<String>,
    pub arfs_version: Option<String>,
    pub content_type: Option<String>,
    pub entity_type: Option<String>,
    pub drive_id: Option<String>,
    pub folder_id: Option<String>,
    pub file_id: Option<String>,
    pub parent_folder_id: Option<String>,
    pub drive_privacy: Option<String>,
    pub drive_auth_mode: Option<String>,
    pub cipher: Option<String>,
    pub cipher_iv: Option<String>,
    pub unix_time: Option<i64>,
    pub privacy: Privacy,

    pub name: Option<String>,
    pub description: Option<String>,
    pub size: Option<u64>,
    pub last_modified: Option<i64>,
    pub data_tx_id: Option<String>,
    pub data_content_type: Option<String>,
    pub root_folder_id: Option<String>,

    /// Tags outside the known vocabulary, in ledger order.
    pub unknown_tags: Vec<Tag>,
    /// Payload fields outside the known set.
    pub unknown_fields: Vec<String>,
}

impl EntityInfo {
    /// Derive the tag half of the state from one transaction.
    ///
    /// Duplicate tags keep their first value.
    pub fn from_entry(entry: &Entry) -> Self {
        let mut info = Self {
            tx_id: Some(entry.id().to_string()),
            confirmation: Some(entry.confirmation()),
            ..Self::default()
        };

        for tag in entry.tags() {
            let Some(known) = KnownTag::from_name(&tag.name) else {
                warn!(tx_id = %entry.id(), tag = %tag.name, "Ignoring unknown tag");
                info.unknown_tags.push(tag.clone());
                continue;
            };
            let value = tag.value.clone();
            match known {
                KnownTag::AppName => set_once(&mut info.app_name, value),
                KnownTag::AppVersion => set_once(&mut info.app_version, value),
                KnownTag::AppPlatform => set_once(&mut info.app_platform, value),
                KnownTag::ArFs => set_once(&mut info.arfs_version, value),
                KnownTag::ContentType => set_once(&mut info.content_type, value),
                KnownTag::EntityType => set_once(&mut info.entity_type, value),
                KnownTag::DriveId => set_once(&mut info.drive_id, value),
                KnownTag::FolderId => set_once(&mut info.folder_id, value),
                KnownTag::FileId => set_once(&mut info.file_id, value),
                KnownTag::ParentFolderId => set_once(&mut info.parent_folder_id, value),
                KnownTag::DrivePrivacy => set_once(&mut info.drive_privacy, value),
                KnownTag::DriveAuthMode => set_once(&mut info.drive_auth_mode, value),
                KnownTag::Cipher => set_once(&mut info.cipher, value),
                KnownTag::CipherIv => set_once(&mut info.cipher_iv, value),
                KnownTag::UnixTime => {
                    if info.unix_time.is_none() {
                        match value.parse() {
                            Ok(t) => info.unix_time = Some(t),
                            Err(_) => warn!(tx_id = %entry.id(), value = %value, "Unix-Time is not an integer"),
                        }
                    }
                },
            }
        }

        info.privacy = Privacy::derive(info.drive_privacy.as_deref(), info.cipher.as_deref());
        info
    }

    /// Merge payload-derived fields.
    pub fn apply_payload(&mut self, payload: &MetadataPayload) {
        self.name.clone_from(&payload.name);
        self.description.clone_from(&payload.description);
        self.size = payload.size;
        self.last_modified = payload.last_modified_date;
        self.data_tx_id.clone_from(&payload.data_tx_id);
        self.data_content_type.clone_from(&payload.data_content_type);
        self.root_folder_id.clone_from(&payload.root_folder_id);
        self.unknown_fields = payload.unknown_fields();
    }

    /// Tracked fields with a value, in display order.
    pub fn tracked_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let mut push = |label: &'static str, value: Option<String>| {
            if let Some(value) = value {
                fields.push((label, value));
            }
        };
        push("name", self.name.clone());
        push("size", self.size.map(format_bytes));
        push("modified", self.last_modified.map(format_millis));
        push("data tx", self.data_tx_id.clone());
        push("data type", self.data_content_type.clone());
        push("content type", self.content_type.clone());
        push("parent folder", self.parent_folder_id.clone());
        push("root folder", self.root_folder_id.clone());
        push("description", self.description.clone());
        push("privacy", Some(self.privacy.to_string()));
        push("auth mode", self.drive_auth_mode.clone());
        push("cipher", self.cipher.clone());
        fields
    }

    /// Human-readable list of tracked fields that differ from `previous`.
    pub fn changes_since(&self, previous: &Self) -> Vec<String> {
        let before: HashMap<_, _> = previous.tracked_fields().into_iter().collect();
        let after = self.tracked_fields();
        let mut changes = Vec::new();

        for (label, value) in &after {
            match before.get(label) {
                Some(old) if old == value => {},
                Some(old) => changes.push(format!("{label}: {old} -> {value}")),
                None => changes.push(format!("{label}: {value}")),
            }
        }
        for (label, old) in previous.tracked_fields() {
            if !after.iter().any(|(l, _)| *l == label) {
                changes.push(format!("{label}: {old} -> (removed)"));
            }
        }
        changes
    }
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// One line of entity history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub tx_id: String,
    pub description: String,
}

/// Write-once history keyed by transaction id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct History {
    lines: Vec<HistoryLine>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl History {
    /// Record `description` for `tx_id` unless a line already exists.
    ///
    /// Returns `true` if the line was added.
    pub fn record(&mut self, tx_id: &str, description: String) -> bool {
        if self.index.contains_key(tx_id) {
            return false;
        }
        self.index.insert(tx_id.to_string(), self.lines.len());
        self.lines.push(HistoryLine {
            tx_id: tx_id.to_string(),
            description,
        });
        true
    }

    pub fn get(&self, tx_id: &str) -> Option<&str> {
        self.index
            .get(tx_id)
            .map(|&i| self.lines[i].description.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A distinct data transaction referenced by the entity over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataVersion {
    pub data_tx_id: String,
    pub metadata_tx_id: String,
    pub name: Option<String>,
    pub size: Option<u64>,
    pub confirmation: String,
}

impl DataVersion {
    pub fn describe(&self) -> String {
        format!(
            "{} ({}, {})",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.size.map_or_else(|| "unknown size".to_string(), format_bytes),
            self.confirmation
        )
    }
}

/// A drive, folder or file reconstructed from its transactions.
#[derive(Debug, Clone)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: String,
    pub owner: String,
    pub creation_tx: String,
    pub latest_tx: String,
    entries: Vec<Entry>,
    entry_index: HashMap<String, usize>,
    payloads: HashMap<String, Option<MetadataPayload>>,
    pub info: EntityInfo,
    pub history: History,
    pub versions: Vec<DataVersion>,
    /// Problems met during reconstruction.
    pub errors: Vec<String>,
    /// Transactions rejected because another owner wrote them.
    pub excluded: Vec<String>,
}

impl Entity {
    /// Establish ownership over `entries` (oldest first, as queried).
    ///
    /// The owner of the first entry is canonical; entries by anyone else are
    /// excluded and logged. The latest transaction is the one at the greatest
    /// block height, with pending entries counted as newest and ties going to
    /// the first one found. Returns `None` for an empty input.
    pub fn from_entries(kind: EntityKind, id: &str, entries: Vec<Entry>) -> Option<Self> {
        let owner = entries.first()?.owner().to_string();

        let (owned, foreign): (Vec<Entry>, Vec<Entry>) =
            entries.into_iter().partition(|e| e.owner() == owner);

        for entry in &foreign {
            warn!(
                entity_id = %id,
                tx_id = %entry.id(),
                tx_owner = %entry.owner(),
                owner = %owner,
                "Excluding transaction written by a different owner"
            );
        }

        let Some(first) = owned.first() else {
            error!(entity_id = %id, "Canonical owner has no transactions");
            return None;
        };
        let creation_tx = first.id().to_string();

        let mut latest = first;
        for entry in &owned[1..] {
            if entry.confirmation().sort_key() > latest.confirmation().sort_key() {
                latest = entry;
            }
        }
        let latest_tx = latest.id().to_string();

        let entry_index = owned
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id().to_string(), i))
            .collect();

        Some(Self {
            kind,
            id: id.to_string(),
            owner,
            creation_tx,
            latest_tx,
            entries: owned,
            entry_index,
            payloads: HashMap::new(),
            info: EntityInfo::default(),
            history: History::default(),
            versions: Vec::new(),
            errors: Vec::new(),
            excluded: foreign.iter().map(|e| e.id().to_string()).collect(),
        })
    }

    /// Owner-scoped transactions in query order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of owner-scoped transactions.
    pub fn operations(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, tx_id: &str) -> Option<&Entry> {
        self.entry_index.get(tx_id).map(|&i| &self.entries[i])
    }

    pub fn is_private(&self) -> bool {
        self.info.privacy.is_private()
    }

    /// Cached payload lookup: `None` if never fetched, `Some(None)` if the
    /// fetch was skipped or failed.
    pub fn cached_payload(&self, tx_id: &str) -> Option<Option<&MetadataPayload>> {
        self.payloads.get(tx_id).map(Option::as_ref)
    }

    pub(crate) fn cache_payload(&mut self, tx_id: &str, payload: Option<MetadataPayload>) {
        self.payloads.insert(tx_id.to_string(), payload);
    }
}
