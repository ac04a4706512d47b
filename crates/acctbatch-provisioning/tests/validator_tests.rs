//! Batch Validator Tests
//!
//! Covers `BatchValidator` against an in-memory store:
//! - corrected rows overwrite earlier INVALID rows of the same batch
//! - repeated VALID rows are flagged and still written
//! - report rows follow batch line order
//! - classification without writes

mod common;

use std::sync::Arc;

use acctbatch_core::{MemoryRecordStore, RecordStore, RequestStatus};
use acctbatch_provisioning::{BatchValidator, DirectoryInspector, RowOutcome};

use common::{init_test_logging, StaticDirectory, HEADER};

fn validator(store: Arc<MemoryRecordStore>) -> BatchValidator {
    BatchValidator::new(
        DirectoryInspector::new(Arc::new(StaticDirectory::standard())),
        store,
    )
}

#[tokio::test]
async fn test_corrected_row_overwrites_invalid_row() {
    init_test_logging();
    let store = Arc::new(MemoryRecordStore::new());
    let batch = format!(
        "{HEADER}\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Marketing\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Prod\n"
    );

    let report = validator(store.clone()).validate_batch(&batch).await.unwrap();

    assert_eq!(report.writes, 2);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.valid, 1);
    assert_eq!(report.duplicates, 0);
    assert!(report.rows.iter().all(|r| r.duplicate_of.is_none()));

    let stored = store.get("acme-01").await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Valid);
    assert_eq!(stored.fields.org_unit, "Prod");
}

#[tokio::test]
async fn test_repeated_valid_row_is_flagged_and_written() {
    init_test_logging();
    let store = Arc::new(MemoryRecordStore::new());
    let batch = format!(
        "{HEADER}\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Prod\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Dev\n"
    );

    let report = validator(store.clone()).validate_batch(&batch).await.unwrap();

    assert_eq!(report.writes, 2);
    assert_eq!(report.valid, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.rows[0].duplicate_of, None);
    assert_eq!(report.rows[1].duplicate_of, Some(2));
    assert!(report.rows[1].written);

    // Last write wins.
    let stored = store.get("acme-01").await.unwrap().unwrap();
    assert_eq!(stored.fields.org_unit, "Dev");
}

#[tokio::test]
async fn test_report_rows_follow_line_order() {
    init_test_logging();
    let store = Arc::new(MemoryRecordStore::new());
    let batch = format!(
        "{HEADER}\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Prod\n\
         acme-02,acme02@example.com\n\
         acme-03,acme03@example.com,owner@example.com,Alan,Turing,Prod\n"
    );

    let report = validator(store).validate_batch(&batch).await.unwrap();

    let lines: Vec<_> = report.rows.iter().map(|r| r.line_number).collect();
    assert_eq!(lines, vec![2, 3, 4]);
    assert!(matches!(report.rows[1].outcome, RowOutcome::Unreadable { .. }));
    assert_eq!(report.unreadable, 1);
    assert_eq!(report.writes, 2);
}

#[tokio::test]
async fn test_classify_batch_writes_nothing() {
    init_test_logging();
    let store = Arc::new(MemoryRecordStore::new());
    let batch = format!(
        "{HEADER}\n\
         acme-01,acme01@example.com,owner@example.com,Ada,Lovelace,Prod\n\
         None,nobody@example.com,owner@example.com,Grace,Hopper,Prod\n"
    );

    let report = validator(store.clone()).classify_batch(&batch).await.unwrap();

    assert_eq!(report.valid, 1);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.writes, 0);
    assert!(report.rows.iter().all(|r| !r.written));
    assert_eq!(store.write_count(), 0);
    assert!(store.snapshot().is_empty());
}
