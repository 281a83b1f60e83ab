//! Rendering of verification reports, entities and raw transactions.
//!
//! Three formats are supported: an aligned text table for terminals, CSV rows
//! (`Filename,Status,FileID,MetaTXID,MetaState,DataTXID,DataState,Details`)
//! and pretty-printed JSON.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::Write;

use crate::arfs::{DataVersion, Entity, EntityInfo, HistoryLine};
use crate::ledger::Entry;
use crate::utils::{format_bytes, format_timestamp};
use crate::verify::{DriveReport, FileRecord};

/// CSV header for per-file rows.
pub const CSV_HEADER: &str = "Filename,Status,FileID,MetaTXID,MetaState,DataTXID,DataState,Details";

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Json,
}

/// Remembers which error details were already shown in this invocation.
#[derive(Debug, Default)]
pub struct ReportContext {
    shown: HashSet<String>,
}

impl ReportContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `message` is seen.
    pub fn first_sighting(&mut self, message: &str) -> bool {
        self.shown.insert(message.to_string())
    }
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// One CSV row for `record`, without a trailing newline.
pub fn csv_row(record: &FileRecord) -> String {
    [
        record.filename.as_str(),
        record.health.label(),
        record.file_id.as_str(),
        record.metadata_tx_id.as_str(),
        record.metadata_state.as_str(),
        record.data_tx_id.as_deref().unwrap_or(""),
        record.data_state.as_str(),
        record.details.as_str(),
    ]
    .iter()
    .map(|field| csv_field(field))
    .collect::<Vec<_>>()
    .join(",")
}

/// Header plus one row per record.
pub fn render_csv(report: &DriveReport) -> String {
    let mut out = String::with_capacity(64 * (report.records.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for record in &report.records {
        out.push_str(&csv_row(record));
        out.push('\n');
    }
    out
}

/// Pretty JSON of any serializable report.
///
/// # Errors
///
/// Fails only if a value cannot be represented in JSON.
pub fn render_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

/// Text table of a drive report.
///
/// Healthy files are listed only when `all` is set. Repeated error details
/// are printed once and abbreviated afterwards.
pub fn render_text(report: &DriveReport, all: bool, ctx: &mut ReportContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Drive {}", report.drive_id);
    let _ = writeln!(
        out,
        "Owner {}",
        report.owner.as_deref().unwrap_or("(unverified)")
    );
    out.push('\n');

    let shown: Vec<_> = report
        .records
        .iter()
        .filter(|r| all || !r.is_healthy())
        .collect();

    if !shown.is_empty() {
        let width = shown
            .iter()
            .map(|r| r.filename.chars().count())
            .max()
            .unwrap_or(0)
            .clamp(8, 48);
        let _ = writeln!(out, "{:<width$}  {:<11}  {:<43}  DETAILS", "FILENAME", "STATUS", "FILE ID");
        for record in shown {
            let details = if record.details.is_empty() || ctx.first_sighting(&record.details) {
                record.details.clone()
            } else {
                "(as above)".to_string()
            };
            let _ = writeln!(
                out,
                "{:<width$}  {:<11}  {:<43}  {details}",
                display_name(&record.filename),
                record.health.label(),
                record.file_id,
            );
        }
        out.push('\n');
    }

    for note in &report.notes {
        let _ = writeln!(out, "note: {note}");
    }
    if report.superseded > 0 {
        let _ = writeln!(
            out,
            "note: {} superseded metadata transaction(s) ignored",
            report.superseded
        );
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "Total {}  Healthy {}  Failed {}  Missing {}  Unconfirmed {}",
        s.total, s.healthy, s.failed, s.missing, s.unconfirmed
    );
    out
}

fn display_name(filename: &str) -> &str {
    if filename.is_empty() { "(unknown)" } else { filename }
}

/// JSON view of an entity.
#[derive(Debug, Serialize)]
pub struct EntityView<'a> {
    pub kind: String,
    pub id: &'a str,
    pub owner: &'a str,
    pub creation_tx: &'a str,
    pub latest_tx: &'a str,
    pub operations: usize,
    pub info: &'a EntityInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<&'a HistoryLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub versions: Option<&'a [DataVersion]>,
    pub excluded: &'a [String],
    pub errors: &'a [String],
}

impl<'a> EntityView<'a> {
    pub fn new(entity: &'a Entity, history: bool, versions: bool) -> Self {
        Self {
            kind: entity.kind.to_string(),
            id: &entity.id,
            owner: &entity.owner,
            creation_tx: &entity.creation_tx,
            latest_tx: &entity.latest_tx,
            operations: entity.operations(),
            info: &entity.info,
            history: history.then(|| entity.history.iter().collect()),
            versions: versions.then_some(entity.versions.as_slice()),
            excluded: &entity.excluded,
            errors: &entity.errors,
        }
    }
}

/// Text view of an entity, optionally with history and data versions.
pub fn render_entity_text(
    entity: &Entity,
    history: bool,
    versions: bool,
    ctx: &mut ReportContext,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", entity.kind, entity.id);
    let _ = writeln!(out, "  owner         {}", entity.owner);
    let _ = writeln!(out, "  created in    {}", entity.creation_tx);
    let _ = writeln!(out, "  latest tx     {}", entity.latest_tx);
    let _ = writeln!(out, "  operations    {}", entity.operations());
    if let Some(confirmation) = &entity.info.confirmation {
        let _ = writeln!(out, "  state         {confirmation}");
    }
    if let Some(unix_time) = entity.info.unix_time {
        let _ = writeln!(out, "  unix time     {}", format_timestamp(unix_time));
    }
    for (label, value) in entity.info.tracked_fields() {
        let _ = writeln!(out, "  {label:<13} {value}");
    }
    for tag in &entity.info.unknown_tags {
        let _ = writeln!(out, "  (tag) {} = {}", tag.name, tag.value);
    }

    if history {
        out.push_str("\nHistory\n");
        for line in entity.history.iter() {
            let _ = writeln!(out, "  {}  {}", line.tx_id, line.description);
        }
    }

    if versions {
        out.push_str("\nData versions\n");
        for version in &entity.versions {
            let _ = writeln!(out, "  {}  {}", version.data_tx_id, version.describe());
        }
    }

    if !entity.excluded.is_empty() {
        let _ = writeln!(
            out,
            "\n{} transaction(s) by other owners were ignored",
            entity.excluded.len()
        );
    }
    for error in &entity.errors {
        if ctx.first_sighting(error) {
            let _ = writeln!(out, "error: {error}");
        }
    }
    out
}

/// One line per transaction for the query command.
pub fn render_entries_text(entries: &[Entry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let when = entry
            .block_timestamp()
            .map(format_timestamp)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{}  {}  {:<22}  {:>10}  fee {} AR  {when}",
            entry.id(),
            entry.owner(),
            entry.confirmation().to_string(),
            format_bytes(entry.data_size()),
            entry.fee().ar,
        );
        for tag in entry.tags() {
            let _ = writeln!(out, "    {} = {}", tag.name, tag.value);
        }
    }
    out
}

/// CSV listing of transactions for the query command.
pub fn render_entries_csv(entries: &[Entry]) -> String {
    let mut out = String::from("TXID,Owner,Height,Timestamp,DataSize,FeeAR,Tags\n");
    for entry in entries {
        let tags = entry
            .tags()
            .iter()
            .map(|t| format!("{}={}", t.name, t.value))
            .collect::<Vec<_>>()
            .join(";");
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{}",
            csv_field(entry.id()),
            csv_field(entry.owner()),
            entry.block_height().map(|h| h.to_string()).unwrap_or_default(),
            entry.block_timestamp().map(|t| t.to_string()).unwrap_or_default(),
            entry.data_size(),
            entry.fee().ar,
            csv_field(&tags),
        );
    }
    out
}
