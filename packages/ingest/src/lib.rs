#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ledger import into the record store.
//!
//! A ledger is any tabular source with a header row using the template's
//! Chinese column names. Headers are resolved against the allow-list in
//! [`mapping`] up front, so an unknown column aborts the import before any
//! row is written. CSV files are read with the `csv` crate; other sources
//! can feed [`import_rows`] directly.

pub mod mapping;

use std::io::Read;
use std::path::Path;

use geopark_database::{RecordWriter, StoreError};
use geopark_ingest_models::ImportSummary;

use crate::mapping::{MissingField, parse_row, resolve_headers};

/// Errors that can occur during a ledger import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A header is not in the column allow-list.
    #[error("Unknown ledger column: {0:?}")]
    UnknownColumn(String),

    /// The ledger has no header row.
    #[error("Ledger has no header row")]
    MissingHeader,

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing to the record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Imports ledger rows into `writer`.
///
/// Rows missing a required field are skipped and counted as invalid. Rows
/// whose ledger code already exists are skipped, never overwritten.
///
/// # Errors
///
/// Returns [`ImportError::UnknownColumn`] before writing anything if a
/// header is not allow-listed, or [`ImportError::Store`] if a write fails.
pub async fn import_rows<H, C>(
    writer: &dyn RecordWriter,
    headers: &[H],
    rows: &[Vec<C>],
) -> Result<ImportSummary, ImportError>
where
    H: AsRef<str> + Sync,
    C: AsRef<str> + Sync,
{
    let fields = resolve_headers(headers)?;
    let mut summary = ImportSummary::default();

    for (line, cells) in rows.iter().enumerate() {
        let record = match parse_row(&fields, cells) {
            Ok(record) => record,
            Err(MissingField(field)) => {
                log::debug!("Skipping row {}: missing {field}", line + 1);
                summary.skipped_invalid += 1;
                continue;
            }
        };

        if writer.code_exists(&record.tuban_code).await? {
            log::debug!("Skipping existing tuban {}", record.tuban_code);
            summary.skipped_existing += 1;
            continue;
        }

        match writer.insert(&record).await {
            Ok(_) => summary.inserted += 1,
            Err(StoreError::DuplicateCode(code)) => {
                log::debug!("Skipping existing tuban {code}");
                summary.skipped_existing += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::info!(
        "Imported {} tubans ({} existing, {} invalid)",
        summary.inserted,
        summary.skipped_existing,
        summary.skipped_invalid
    );

    Ok(summary)
}

/// Reads a CSV ledger fully, returning its headers and rows.
///
/// # Errors
///
/// Returns [`ImportError`] if the CSV is malformed or has no header row.
pub fn read_csv<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Vec<String>>), ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(ToOwned::to_owned).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::MissingHeader);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(ToOwned::to_owned).collect());
    }

    Ok((headers, rows))
}

/// Imports a CSV ledger read from `reader`.
///
/// The whole file is parsed before anything is written.
///
/// # Errors
///
/// Returns [`ImportError`] if the CSV is malformed, a header is unknown, or
/// a write fails.
pub async fn import_csv<R: Read>(
    writer: &dyn RecordWriter,
    reader: R,
) -> Result<ImportSummary, ImportError> {
    let (headers, rows) = read_csv(reader)?;
    log::info!("Read {} ledger rows", rows.len());
    import_rows(writer, &headers, &rows).await
}

/// Imports the CSV ledger at `path`.
///
/// # Errors
///
/// Returns [`ImportError`] if the file cannot be read, or for any reason
/// [`import_csv`] fails.
pub async fn import_csv_path(
    writer: &dyn RecordWriter,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path)?;
    log::info!("Importing ledger from {}", path.display());
    import_csv(writer, file).await
}

#[cfg(test)]
mod tests {
    use geopark_database::{MemoryStore, RecordStore};
    use geopark_database_models::{RecordFilter, RecordOrder};
    use geopark_tuban_models::{RectifyStatus, ViolationRecord, YesNo};

    use super::*;

    const LEDGER: &str = "\
图斑编号,所属地质公园名称,所在功能区,经度,纬度,整改时限,整改进展,是否销号,罚款金额
TB001,Songshan,核心区,112.95,34.45,2025-03-01,整改中,,5000
TB002,Songshan,缓冲区,bad,34.40,,,是,
,Songshan,核心区,,,,,,
TB003,,核心区,,,,,,
TB900,Songshan,,,,,,,
";

    #[tokio::test]
    async fn csv_import_counts_every_outcome() {
        let store = MemoryStore::with_records(vec![ViolationRecord::new(1, "TB900", "Songshan")]);

        let summary = import_csv(&store, LEDGER.as_bytes()).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                skipped_existing: 1,
                skipped_invalid: 2,
            }
        );
        assert_eq!(summary.total(), 5);

        let rows = store
            .fetch(&RecordFilter::all(), RecordOrder::Id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);

        let first = rows.iter().find(|r| r.tuban_code == "TB001").unwrap();
        assert_eq!(first.coordinates(), Some((112.95, 34.45)));
        assert_eq!(first.rectify_status, Some(RectifyStatus::InProgress));
        assert_eq!(first.is_closed, YesNo::No);

        let second = rows.iter().find(|r| r.tuban_code == "TB002").unwrap();
        assert_eq!(second.longitude, None);
        assert_eq!(second.rectify_status, Some(RectifyStatus::NotStarted));
        assert_eq!(second.is_closed, YesNo::Yes);
    }

    #[tokio::test]
    async fn unknown_column_aborts_before_writing() {
        let store = MemoryStore::new();
        let ledger = "图斑编号,所属地质公园名称,颜色\nTB001,Songshan,red\n";

        let err = import_csv(&store, ledger.as_bytes()).await.unwrap_err();
        assert!(matches!(err, ImportError::UnknownColumn(ref h) if h == "颜色"));
        assert_eq!(store.count(&RecordFilter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn repeated_code_in_one_ledger_is_imported_once() {
        let store = MemoryStore::new();
        let headers = ["图斑编号", "所属地质公园名称"];
        let rows = vec![vec!["TB001", "Songshan"], vec!["TB001", "Danxiashan"]];

        let summary = import_rows(&store, &headers, &rows).await.unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped_existing, 1);

        let stored = store
            .fetch(&RecordFilter::all(), RecordOrder::Id)
            .await
            .unwrap();
        assert_eq!(stored[0].park_name, "Songshan");
    }

    #[test]
    fn blank_lines_are_ignored() {
        let (headers, rows) = read_csv("图斑编号,所属地质公园名称\n,\nTB001,A\n".as_bytes()).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(rows, vec![vec!["TB001".to_string(), "A".to_string()]]);
    }
}
