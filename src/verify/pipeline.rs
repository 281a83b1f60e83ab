//! Drive upload verification.
//!
//! For every file of a drive the pipeline pairs the newest metadata
//! transaction with the data transaction its payload points to and decides
//! whether the file is retrievable. Files are verified concurrently: tasks
//! are spawned one after another with a fixed delay between spawns, then
//! awaited in the order they were spawned so the report order is stable.

use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::gaps::find_gaps;
use super::record::{FileRecord, Summary};
use crate::arfs::{EntityKind, EntityResolver, KnownTag, MetadataPayload, PayloadError};
use crate::constants;
use crate::error::{Error, Result};
use crate::gateway::{GatewayError, PayloadFetcher};
use crate::ledger::{Entry, PaginatedFetcher, QueryFilter, SortOrder};
use crate::reliability::{RetryPolicy, retry_async};

/// Tuning for a verification run.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Policy for metadata fetches and data transaction polling.
    pub retry: RetryPolicy,
    /// Minimum delay between two task dispatches.
    pub dispatch_delay: Duration,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            dispatch_delay: Duration::from_millis(constants::DEFAULT_DISPATCH_DELAY_MS),
        }
    }
}

/// Inclusive bounds for numeric gap detection; missing bounds are observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NumericRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

/// Optional narrowing of a verification report.
#[derive(Debug, Clone, Default)]
pub struct VerifyFilters {
    /// Keep only files with this extension (case-insensitive, dot optional).
    pub extension: Option<String>,
    /// Lay files out as a numbered sequence and report gaps.
    pub numeric: Option<NumericRange>,
}

/// Result of verifying one drive.
#[derive(Debug, Clone, Serialize)]
pub struct DriveReport {
    pub drive_id: String,
    /// Drive owner, if the drive entity could be resolved.
    pub owner: Option<String>,
    pub summary: Summary,
    pub records: Vec<FileRecord>,
    /// Older metadata transactions superseded during deduplication.
    pub superseded: usize,
    pub notes: Vec<String>,
}

/// Shared, read-only state handed to every verification task.
struct TaskContext {
    fetcher: PaginatedFetcher,
    payloads: Arc<dyn PayloadFetcher>,
    index: HashMap<String, Entry>,
    retry: RetryPolicy,
}

/// Verifies every file of a drive.
pub struct VerificationPipeline {
    fetcher: PaginatedFetcher,
    payloads: Arc<dyn PayloadFetcher>,
    config: VerifyConfig,
    progress: ProgressBar,
}

impl VerificationPipeline {
    pub fn new(
        fetcher: PaginatedFetcher,
        payloads: Arc<dyn PayloadFetcher>,
        config: VerifyConfig,
    ) -> Self {
        Self {
            fetcher,
            payloads,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report collected files on `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Verify drive `drive_id`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty drive id or when the drive's
    /// transactions could not be fetched completely. Per-file problems are
    /// reported in the records instead.
    pub async fn verify_drive(&self, drive_id: &str, filters: &VerifyFilters) -> Result<DriveReport> {
        let drive_id = drive_id.trim();
        if drive_id.is_empty() {
            return Err(Error::missing_identifier("drive id"));
        }
        let mut notes = Vec::new();

        let resolver = EntityResolver::new(self.fetcher.clone());
        let owner = resolver
            .resolve(drive_id, EntityKind::Drive)
            .await?
            .map(|drive| drive.owner);

        let filter = match &owner {
            Some(owner) => QueryFilter::new().owner(owner),
            None => {
                warn!(drive_id = %drive_id, "Drive owner unknown, verifying without owner check");
                notes.push("drive entity not found; owner was not verified".to_string());
                QueryFilter::new().tag(KnownTag::DriveId.name(), drive_id)
            },
        }
        .sort(SortOrder::NewestFirst);

        let outcome = self.fetcher.fetch(&filter, None).await;
        if !outcome.succeeded {
            return Err(Error::incomplete_fetch(
                format!("drive {drive_id}"),
                outcome.entries.len(),
            ));
        }

        let (files, superseded) = latest_file_metadata(&outcome.entries, drive_id);
        info!(
            drive_id = %drive_id,
            transactions = outcome.entries.len(),
            files = files.len(),
            superseded,
            "Verifying drive files"
        );

        let mut index = HashMap::with_capacity(outcome.entries.len());
        for entry in outcome.entries {
            index.entry(entry.id().to_string()).or_insert(entry);
        }
        let ctx = Arc::new(TaskContext {
            fetcher: self.fetcher.clone(),
            payloads: Arc::clone(&self.payloads),
            index,
            retry: self.config.retry.clone(),
        });

        let mut records = self.run_tasks(&ctx, files).await;

        if let Some(extension) = &filters.extension {
            let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
            // Unnamed records are failures whose name is unknown; keep them.
            records.retain(|r| r.filename.is_empty() || r.extension().as_deref() == Some(&wanted));
        }

        if let Some(range) = filters.numeric {
            let gaps = find_gaps(&records, range.min, range.max);
            info!(
                drive_id = %drive_id,
                slots = gaps.slots.len(),
                missing = gaps.missing_numbers().len(),
                unnumbered = gaps.unnumbered.len(),
                "Numeric gap check done"
            );
            notes.extend(gaps.notes);
            records = gaps.slots;
            records.extend(gaps.unnumbered);
        }

        Ok(DriveReport {
            drive_id: drive_id.to_string(),
            owner,
            summary: Summary::from_records(&records),
            records,
            superseded,
            notes,
        })
    }

    /// Fire every task, then collect results in submission order.
    async fn run_tasks(&self, ctx: &Arc<TaskContext>, files: Vec<(String, Entry)>) -> Vec<FileRecord> {
        self.progress.set_length(files.len() as u64);

        let mut handles = Vec::with_capacity(files.len());
        for (i, (file_id, metadata)) in files.into_iter().enumerate() {
            if i > 0 && !self.config.dispatch_delay.is_zero() {
                tokio::time::sleep(self.config.dispatch_delay).await;
            }
            let metadata_tx = metadata.id().to_string();
            let task = tokio::spawn(verify_file(Arc::clone(ctx), file_id.clone(), metadata));
            handles.push((file_id, metadata_tx, task));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (file_id, metadata_tx, task) in handles {
            let record = match task.await {
                Ok(record) => record,
                Err(e) => {
                    warn!(file_id = %file_id, error = %e, "Verification task failed");
                    let mut record = FileRecord::new(file_id, metadata_tx);
                    record.mark_error(format!("verification task failed: {e}"), false);
                    record
                },
            };
            self.progress.inc(1);
            records.push(record);
        }
        self.progress.finish_and_clear();
        records
    }
}

/// Newest metadata transaction per file of `drive_id`.
///
/// `entries` must be newest first; the first entry seen for a file id wins
/// and later ones are counted as superseded.
pub fn latest_file_metadata(entries: &[Entry], drive_id: &str) -> (Vec<(String, Entry)>, usize) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut superseded = 0;

    for entry in entries {
        if entry.tag(KnownTag::EntityType.name()) != Some(EntityKind::File.as_tag_value())
            || entry.tag(KnownTag::DriveId.name()) != Some(drive_id)
        {
            continue;
        }
        let Some(file_id) = entry.tag(KnownTag::FileId.name()) else {
            warn!(tx_id = %entry.id(), "File metadata without File-Id");
            continue;
        };
        if seen.insert(file_id.to_string()) {
            files.push((file_id.to_string(), entry.clone()));
        } else {
            warn!(
                file_id = %file_id,
                tx_id = %entry.id(),
                "Dropping superseded metadata transaction"
            );
            superseded += 1;
        }
    }
    (files, superseded)
}

async fn verify_file(ctx: Arc<TaskContext>, file_id: String, metadata: Entry) -> FileRecord {
    let mut record = FileRecord::new(file_id, metadata.id());
    record.metadata_state = metadata.confirmation().to_string();

    let payloads = &ctx.payloads;
    let tx_id = metadata.id();
    let payload = retry_async(
        &ctx.retry,
        "file metadata",
        || async move {
            let text = payloads.fetch_payload(tx_id).await?;
            let payload = MetadataPayload::parse(&text)?;
            Ok::<_, PayloadError>(payload)
        },
        |_| true,
    )
    .await;

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            record.mark_error(e.to_string(), false);
            return record;
        },
    };
    record.filename = payload.name.clone().unwrap_or_default();

    let Some(data_tx_id) = payload.data_tx_id.filter(|id| !id.is_empty()) else {
        record.mark_error("metadata has no dataTxId", true);
        return record;
    };
    record.data_tx_id = Some(data_tx_id.clone());

    let data = match ctx.index.get(&data_tx_id) {
        Some(entry) => Some(entry.clone()),
        None => poll_transaction(&ctx, &data_tx_id).await,
    };
    classify(&mut record, &metadata, data.as_ref());
    debug!(
        file_id = %record.file_id,
        health = %record.health,
        "File verified"
    );
    record
}

/// Look a transaction up by id until it appears or the policy is spent.
async fn poll_transaction(ctx: &TaskContext, tx_id: &str) -> Option<Entry> {
    let fetcher = &ctx.fetcher;
    let result = retry_async(
        &ctx.retry,
        "data transaction status",
        || async move {
            match fetcher.fetch_by_id(tx_id).await {
                Ok(Some(entry)) => Ok(entry),
                Ok(None) => Err(GatewayError::NotFound(tx_id.to_string())),
                Err(e) => Err(e),
            }
        },
        |e| matches!(e, GatewayError::NotFound(_)),
    )
    .await;

    match result {
        Ok(entry) => Some(entry),
        Err(e) => {
            debug!(tx_id = %tx_id, error = %e, "Data transaction not found");
            None
        },
    }
}

/// Decide a record's health from its two transactions.
pub fn classify(record: &mut FileRecord, metadata: &Entry, data: Option<&Entry>) {
    let meta_confirmed = metadata.confirmation().is_confirmed();
    record.metadata_state = metadata.confirmation().to_string();

    let Some(data) = data else {
        record.data_state = "not found".to_string();
        if meta_confirmed {
            record.mark_error("data transaction missing", true);
        } else {
            record.mark_pending("data transaction not yet indexed");
        }
        return;
    };

    record.data_state = data.confirmation().to_string();
    match (meta_confirmed, data.confirmation().is_confirmed()) {
        (true, true) => record.mark_healthy(),
        (false, true) => record.mark_pending("metadata transaction unconfirmed"),
        (true, false) => record.mark_pending("data transaction unconfirmed"),
        (false, false) => record.mark_pending("metadata and data transactions unconfirmed"),
    }
}
