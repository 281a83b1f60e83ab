//! Per-file verification records.

use serde::Serialize;
use std::fmt;

/// Verification verdict of one file.
///
/// A single enum makes "healthy and failed at once" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Metadata and data transactions are both confirmed.
    Healthy,
    /// At least one side is still waiting for a block.
    Pending,
    /// Metadata unreadable or data transaction not found.
    Error,
    /// Placeholder for a number absent from a sequence.
    Missing,
}

impl Health {
    /// Preference when two files claim the same slot.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Healthy => 3,
            Self::Pending => 2,
            Self::Error => 1,
            Self::Missing => 0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Pending => "unconfirmed",
            Self::Error => "failed",
            Self::Missing => "missing",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verification state of one logical file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub file_id: String,
    pub metadata_tx_id: String,
    pub metadata_state: String,
    pub data_tx_id: Option<String>,
    pub data_state: String,
    pub filename: String,
    pub health: Health,
    pub analyzed: bool,
    pub details: String,
}

impl FileRecord {
    /// A record for a file whose verification has not run yet.
    pub fn new(file_id: impl Into<String>, metadata_tx_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            metadata_tx_id: metadata_tx_id.into(),
            metadata_state: String::new(),
            data_tx_id: None,
            data_state: String::new(),
            filename: String::new(),
            health: Health::Pending,
            analyzed: false,
            details: String::new(),
        }
    }

    /// Synthesized placeholder for sequence number `number`.
    pub fn missing(number: u64) -> Self {
        Self {
            file_id: String::new(),
            metadata_tx_id: String::new(),
            metadata_state: String::new(),
            data_tx_id: None,
            data_state: String::new(),
            filename: number.to_string(),
            health: Health::Missing,
            analyzed: true,
            details: "no file with this number was found".to_string(),
        }
    }

    pub fn mark_healthy(&mut self) {
        self.health = Health::Healthy;
        self.analyzed = true;
        self.details.clear();
    }

    pub fn mark_pending(&mut self, details: impl Into<String>) {
        self.health = Health::Pending;
        self.analyzed = true;
        self.details = details.into();
    }

    /// Mark as failed. `analyzed` says whether the record's transactions
    /// were inspected at all.
    pub fn mark_error(&mut self, details: impl Into<String>, analyzed: bool) {
        self.health = Health::Error;
        self.analyzed = analyzed;
        self.details = details.into();
    }

    pub fn is_healthy(&self) -> bool {
        self.health == Health::Healthy
    }

    pub fn is_pending(&self) -> bool {
        self.health == Health::Pending
    }

    pub fn is_error(&self) -> bool {
        self.health == Health::Error
    }

    pub fn is_missing(&self) -> bool {
        self.health == Health::Missing
    }

    /// Extension of the filename, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Aggregate counts for a verification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Summary {
    pub total: usize,
    pub healthy: usize,
    pub failed: usize,
    pub missing: usize,
    pub unconfirmed: usize,
}

impl Summary {
    pub fn from_records(records: &[FileRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.health {
                Health::Healthy => summary.healthy += 1,
                Health::Pending => summary.unconfirmed += 1,
                Health::Error => summary.failed += 1,
                Health::Missing => summary.missing += 1,
            }
        }
        summary
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }
}
