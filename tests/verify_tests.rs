//! Drive verification against the in-memory ledger.

mod common;

use arscan::Error;
use arscan::ledger::PaginatedFetcher;
use arscan::verify::{
    DriveReport, FileRecord, Health, NumericRange, Summary, VerificationPipeline, VerifyConfig,
    VerifyFilters,
};
use common::{
    ALICE, MALLORY, MockLedger, MockLedgerBuilder, data_tx, drive_tx, fast_retry, file_payload,
    file_tx,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DRIVE: &str = "drive-1";

fn pipeline(ledger: &Arc<MockLedger>) -> VerificationPipeline {
    let fetcher = PaginatedFetcher::new(ledger.clone()).with_retry(fast_retry());
    VerificationPipeline::new(
        fetcher,
        ledger.clone(),
        VerifyConfig {
            retry: fast_retry(),
            dispatch_delay: Duration::from_millis(1),
        },
    )
}

async fn verify(ledger: MockLedger, filters: VerifyFilters) -> DriveReport {
    verify_shared(&Arc::new(ledger), filters).await
}

async fn verify_shared(ledger: &Arc<MockLedger>, filters: VerifyFilters) -> DriveReport {
    pipeline(ledger)
        .verify_drive(DRIVE, &filters)
        .await
        .expect("verification failed")
}

fn numeric() -> VerifyFilters {
    VerifyFilters {
        extension: None,
        numeric: Some(NumericRange::default()),
    }
}

fn with_drive() -> MockLedgerBuilder {
    MockLedger::builder().entry(drive_tx("drive-tx", DRIVE, ALICE, 1))
}

/// A confirmed file whose metadata and data are both on the ledger.
fn healthy_file(builder: MockLedgerBuilder, n: u64, name: &str) -> MockLedgerBuilder {
    let meta = format!("meta-{n}");
    let data = format!("data-{n}");
    builder
        .entry(file_tx(&meta, DRIVE, &format!("file-{n}"), ALICE, Some(10 + n)))
        .entry(data_tx(&data, ALICE, Some(10 + n)))
        .payload(&meta, &file_payload(name, &data))
}

fn record<'a>(report: &'a DriveReport, file_id: &str) -> &'a FileRecord {
    report
        .records
        .iter()
        .find(|r| r.file_id == file_id)
        .unwrap_or_else(|| panic!("no record for {file_id}"))
}

// =============================================================================
// Classification
// =============================================================================

#[tokio::test]
async fn test_three_file_drive() {
    let ledger = healthy_file(with_drive(), 1, "ok.png")
        .entry(file_tx("meta-2", DRIVE, "file-2", ALICE, Some(12)))
        .payload("meta-2", "{broken")
        .entry(file_tx("meta-3", DRIVE, "file-3", ALICE, Some(13)))
        .payload("meta-3", &file_payload("lost.png", "data-never-uploaded"))
        .build();

    let ledger = Arc::new(ledger);
    let report = verify_shared(&ledger, VerifyFilters::default()).await;

    assert_eq!(
        report.summary,
        Summary {
            total: 3,
            healthy: 1,
            failed: 2,
            missing: 0,
            unconfirmed: 0,
        }
    );
    assert_eq!(report.owner.as_deref(), Some(ALICE));

    let ok = record(&report, "file-1");
    assert!(ok.is_healthy());
    assert_eq!(ok.filename, "ok.png");
    assert_eq!(ok.data_tx_id.as_deref(), Some("data-1"));

    let broken = record(&report, "file-2");
    assert!(broken.is_error());
    assert!(!broken.analyzed);
    assert!(broken.details.contains("could not parse metadata"));

    let lost = record(&report, "file-3");
    assert!(lost.is_error());
    assert!(lost.analyzed);
    assert_eq!(lost.details, "data transaction missing");
    assert_eq!(lost.data_state, "not found");

    for r in &report.records {
        let verdicts = [r.is_healthy(), r.is_error(), r.is_pending()];
        assert_eq!(verdicts.iter().filter(|v| **v).count(), 1);
    }

    // The unparsable payload is tried once per allowed attempt.
    assert_eq!(ledger.payload_attempts("meta-2"), 3);
    assert_eq!(ledger.payload_attempts("meta-1"), 1);
}

#[tokio::test]
async fn test_missing_payload_exhausts_attempts() {
    let ledger = Arc::new(
        with_drive()
            .entry(file_tx("meta-1", DRIVE, "file-1", ALICE, Some(20)))
            .build(),
    );
    let report = verify_shared(&ledger, VerifyFilters::default()).await;

    let file = record(&report, "file-1");
    assert_eq!(file.health, Health::Error);
    assert!(file.details.contains("could not fetch metadata"));
    assert_eq!(ledger.payload_attempts("meta-1"), 3);
}

#[tokio::test]
async fn test_records_follow_newest_first_order() {
    let ledger = healthy_file(healthy_file(with_drive(), 1, "a.png"), 2, "b.png").build();
    let report = verify(ledger, VerifyFilters::default()).await;

    let order: Vec<_> = report.records.iter().map(|r| r.file_id.as_str()).collect();
    assert_eq!(order, vec!["file-2", "file-1"]);
}

#[tokio::test]
async fn test_pending_sides() {
    let ledger = with_drive()
        // Metadata pending, data not yet indexed.
        .entry(file_tx("meta-1", DRIVE, "file-1", ALICE, None))
        .payload("meta-1", &file_payload("1.png", "data-1"))
        // Metadata confirmed, data pending.
        .entry(file_tx("meta-2", DRIVE, "file-2", ALICE, Some(20)))
        .entry(data_tx("data-2", ALICE, None))
        .payload("meta-2", &file_payload("2.png", "data-2"))
        .build();

    let report = verify(ledger, VerifyFilters::default()).await;

    let waiting = record(&report, "file-1");
    assert!(waiting.is_pending());
    assert_eq!(waiting.details, "data transaction not yet indexed");

    let unmined = record(&report, "file-2");
    assert!(unmined.is_pending());
    assert_eq!(unmined.data_state, "pending");
    assert_eq!(report.summary.unconfirmed, 2);
}

#[tokio::test]
async fn test_data_found_by_polling() {
    let ledger = with_drive()
        .entry(file_tx("meta-1", DRIVE, "file-1", ALICE, Some(20)))
        .unlisted(data_tx("data-1", MALLORY, Some(21)))
        .payload("meta-1", &file_payload("1.png", "data-1"))
        .build();

    let report = verify(ledger, VerifyFilters::default()).await;
    assert!(record(&report, "file-1").is_healthy());
}

#[tokio::test]
async fn test_missing_data_tx_id() {
    let ledger = with_drive()
        .entry(file_tx("meta-1", DRIVE, "file-1", ALICE, Some(20)))
        .payload("meta-1", r#"{"name":"orphan.png"}"#)
        .build();

    let report = verify(ledger, VerifyFilters::default()).await;
    let orphan = record(&report, "file-1");
    assert!(orphan.is_error());
    assert_eq!(orphan.filename, "orphan.png");
    assert!(orphan.data_tx_id.is_none());
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_slow_file_does_not_hold_back_later_files() {
    let slow = Duration::from_millis(300);
    let ledger = Arc::new(
        healthy_file(healthy_file(healthy_file(with_drive(), 1, "a.png"), 2, "b.png"), 3, "c.png")
            .payload_delay("meta-3", slow)
            .payload_delay("meta-2", Duration::from_millis(150))
            .payload_delay("meta-1", Duration::from_millis(150))
            .build(),
    );

    let started = Instant::now();
    let report = verify_shared(&ledger, VerifyFilters::default()).await;
    let elapsed = started.elapsed();

    // Submission order is newest first, whatever finishes first.
    let order: Vec<_> = report.records.iter().map(|r| r.file_id.as_str()).collect();
    assert_eq!(order, vec!["file-3", "file-2", "file-1"]);
    assert!(report.records.iter().all(|r| r.is_healthy()));
    assert_eq!(ledger.payload_requests(), vec!["meta-3", "meta-2", "meta-1"]);

    // Serialized this would take at least 600ms.
    assert!(elapsed >= slow);
    assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_newest_metadata_wins() {
    let ledger = healthy_file(with_drive(), 1, "old-name.png")
        .entry(file_tx("meta-1b", DRIVE, "file-1", ALICE, Some(40)))
        .payload("meta-1b", &file_payload("new-name.png", "data-1"))
        .build();

    let report = verify(ledger, VerifyFilters::default()).await;

    assert_eq!(report.records.len(), 1);
    let file = record(&report, "file-1");
    assert_eq!(file.metadata_tx_id, "meta-1b");
    assert_eq!(file.filename, "new-name.png");
    assert_eq!(report.superseded, 1);
}

#[tokio::test]
async fn test_other_owners_and_drives_are_ignored() {
    let ledger = healthy_file(with_drive(), 1, "mine.png")
        .entry(file_tx("meta-x", DRIVE, "file-x", MALLORY, Some(30)))
        .entry(file_tx("meta-y", "drive-2", "file-y", ALICE, Some(31)))
        .build();

    let report = verify(ledger, VerifyFilters::default()).await;

    let ids: Vec<_> = report.records.iter().map(|r| r.file_id.as_str()).collect();
    assert_eq!(ids, vec!["file-1"]);
}

#[tokio::test]
async fn test_unknown_drive_owner_falls_back_to_tag_query() {
    let ledger = healthy_file(MockLedger::builder(), 1, "a.png").build();

    let report = verify(ledger, VerifyFilters::default()).await;

    assert!(report.owner.is_none());
    assert!(report.notes.iter().any(|n| n.contains("owner was not verified")));
    assert!(record(&report, "file-1").is_healthy());
}

#[tokio::test]
async fn test_extension_filter() {
    let ledger = healthy_file(healthy_file(with_drive(), 1, "a.PNG"), 2, "b.jpg").build();
    let filters = VerifyFilters {
        extension: Some(".png".to_string()),
        numeric: None,
    };

    let report = verify(ledger, filters).await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].filename, "a.PNG");
    assert_eq!(report.summary.total, 1);
}

// =============================================================================
// Numeric gaps
// =============================================================================

#[tokio::test]
async fn test_numeric_gap_report() {
    let ledger = healthy_file(
        healthy_file(healthy_file(with_drive(), 1, "1.png"), 2, "2.png"),
        4,
        "4.png",
    )
    .entry(file_tx("meta-cover", DRIVE, "file-cover", ALICE, Some(50)))
    .entry(data_tx("data-cover", ALICE, Some(50)))
    .payload("meta-cover", &file_payload("cover.png", "data-cover"))
    .build();

    let report = verify(ledger, numeric()).await;

    let names: Vec<_> = report.records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["1.png", "2.png", "3", "4.png", "cover.png"]);

    let gap = &report.records[2];
    assert_eq!(gap.health, Health::Missing);
    assert!(!gap.is_healthy());
    assert!(gap.analyzed);

    assert_eq!(report.summary.total, 5);
    assert_eq!(report.summary.healthy, 4);
    assert_eq!(report.summary.missing, 1);
    assert!(report.notes.iter().any(|n| n.contains("cover.png")));
}

#[tokio::test]
async fn test_numeric_mode_keeps_unreadable_metadata() {
    let ledger = healthy_file(healthy_file(with_drive(), 1, "1.png"), 2, "2.png")
        .entry(file_tx("meta-3", DRIVE, "file-3", ALICE, Some(13)))
        .payload("meta-3", "{broken")
        .build();

    let plain = verify(ledger, VerifyFilters::default()).await;
    assert_eq!(plain.summary.failed, 1);

    let ledger = healthy_file(healthy_file(with_drive(), 1, "1.png"), 2, "2.png")
        .entry(file_tx("meta-3", DRIVE, "file-3", ALICE, Some(13)))
        .payload("meta-3", "{broken")
        .build();
    let report = verify(ledger, numeric()).await;

    assert_eq!(
        report.summary,
        Summary {
            total: 3,
            healthy: 2,
            failed: 1,
            missing: 0,
            unconfirmed: 0,
        }
    );
    assert!(record(&report, "file-3").is_error());
    assert_eq!(report.records.last().map(|r| r.file_id.as_str()), Some("file-3"));
}

#[tokio::test]
async fn test_numeric_outlier_does_not_expand_range() {
    let ledger = healthy_file(healthy_file(with_drive(), 1, "1.png"), 2, "1700000000000.png").build();

    let report = verify(ledger, numeric()).await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.summary.missing, 0);
    assert!(report.notes.iter().any(|n| n.contains("gaps not reported")));
}

#[tokio::test]
async fn test_numeric_range_bounds() {
    let ledger = healthy_file(with_drive(), 2, "2.png").build();
    let filters = VerifyFilters {
        extension: None,
        numeric: Some(NumericRange {
            min: Some(1),
            max: Some(3),
        }),
    };

    let report = verify(ledger, filters).await;
    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.missing, 2);
    assert_eq!(report.summary.healthy, 1);
}

// =============================================================================
// Command-level failures
// =============================================================================

#[tokio::test]
async fn test_empty_drive_id() {
    let ledger = Arc::new(MockLedger::builder().build());
    let err = pipeline(&ledger)
        .verify_drive("", &VerifyFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingIdentifier(_)));
}

#[tokio::test]
async fn test_incomplete_drive_listing() {
    let ledger = Arc::new(
        healthy_file(with_drive(), 1, "a.png")
            .malformed_call(2)
            .build(),
    );
    let err = pipeline(&ledger)
        .verify_drive(DRIVE, &VerifyFilters::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::IncompleteFetch { .. }));
    assert!(ledger.payload_requests().is_empty());
}
