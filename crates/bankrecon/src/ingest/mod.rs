//! Reading system transactions and bank statements from CSV.
//!
//! System files have the columns `id,amount,type,timestamp`, where `type` is `DEBIT` or
//! `CREDIT` and `timestamp` looks like `2024-03-20 10:30:00`. Bank statements have
//! `id,amount,date` with signed amounts and plain `2024-03-20` dates.
//!
//! Any malformed row aborts the read. Row numbers in errors are 1-based and count the
//! header row when one is present.

mod files;

pub use files::{
    bank_files_in_dir, existing_bank_files, load_bank_records, load_system_transactions,
    resolve_bank_sources, source_label_for,
};

use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{BankRecord, DateRange, Decimal, Direction, SystemTransaction};

pub const SYSTEM_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const BANK_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid format [{record}] in row {row} of file")]
    Format { row: usize, record: String },
    #[error("invalid amount [{value}] in row {row} of file")]
    InvalidAmount { row: usize, value: String },
    #[error("negative amount [{value}] in row {row} of file")]
    NegativeAmount { row: usize, value: String },
    #[error("invalid transaction type [{value}] in row {row} of file")]
    InvalidDirection { row: usize, value: String },
    #[error("invalid date [{value}] in row {row} of file")]
    InvalidDate { row: usize, value: String },
    #[error("failed to read CSV file: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid bank statement directory: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list bank statement directory: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Settings shared by both readers.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Treat the first row as a header. Defaults to `true`.
    pub skip_header: bool,
    /// Drop rows whose date lies outside this range. `None` keeps everything.
    pub date_range: Option<DateRange>,
    /// Label attached to every bank record, usually derived with [`source_label_for`].
    pub source_label: Option<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            skip_header: true,
            date_range: None,
            source_label: None,
        }
    }
}

impl ReaderOptions {
    fn in_range(&self, date: NaiveDate) -> bool {
        self.date_range.is_none_or(|range| range.contains(date))
    }
}

/// Yields `(row, record)` for every data row, row numbers starting at 1.
fn data_rows<R: io::Read>(
    reader: R,
    options: &ReaderOptions,
) -> impl Iterator<Item = Result<(usize, csv::StringRecord), IngestError>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(false)
        // field counts are checked per row so the error can name the row
        .flexible(true)
        .from_reader(reader);
    let skip = usize::from(options.skip_header);

    // a header that fails to decode still fails the file
    reader
        .into_records()
        .enumerate()
        .filter(move |(index, record)| *index >= skip || record.is_err())
        .map(|(index, record)| Ok((index + 1, record?)))
}

fn check_width(row: usize, record: &csv::StringRecord, width: usize) -> Result<(), IngestError> {
    if record.len() != width {
        let record = record.iter().collect::<Vec<_>>().join(",");
        return Err(IngestError::Format { row, record });
    }
    Ok(())
}

fn parse_amount(row: usize, value: &str) -> Result<Decimal, IngestError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|_| IngestError::InvalidAmount {
            row,
            value: value.to_owned(),
        })
}

pub fn read_system_transactions<R: io::Read>(
    reader: R,
    options: &ReaderOptions,
) -> Result<Vec<SystemTransaction>, IngestError> {
    let mut transactions = Vec::new();

    for row in data_rows(reader, options) {
        let (row, record) = row?;
        check_width(row, &record, 4)?;

        let amount = parse_amount(row, &record[1])?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(IngestError::NegativeAmount {
                row,
                value: record[1].to_owned(),
            });
        }

        let direction =
            Direction::from_str(&record[2]).map_err(|_| IngestError::InvalidDirection {
                row,
                value: record[2].to_owned(),
            })?;

        let timestamp = NaiveDateTime::parse_from_str(&record[3], SYSTEM_TIMESTAMP_FORMAT)
            .map_err(|_| IngestError::InvalidDate {
                row,
                value: record[3].to_owned(),
            })?;

        if !options.in_range(timestamp.date()) {
            continue;
        }

        transactions.push(SystemTransaction {
            id: record[0].to_owned(),
            amount,
            direction,
            timestamp,
        });
    }

    Ok(transactions)
}

pub fn read_bank_records<R: io::Read>(
    reader: R,
    options: &ReaderOptions,
) -> Result<Vec<BankRecord>, IngestError> {
    let source_label = options.source_label.clone().unwrap_or_default();
    let mut records = Vec::new();

    for row in data_rows(reader, options) {
        let (row, record) = row?;
        check_width(row, &record, 3)?;

        let amount = parse_amount(row, &record[1])?;
        let date = NaiveDate::parse_from_str(&record[2], BANK_DATE_FORMAT).map_err(|_| {
            IngestError::InvalidDate {
                row,
                value: record[2].to_owned(),
            }
        })?;

        if !options.in_range(date) {
            continue;
        }

        records.push(BankRecord {
            id: record[0].to_owned(),
            amount,
            source_label: source_label.clone(),
            date,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, BANK_DATE_FORMAT).unwrap()
    }

    fn march_20_to_21() -> ReaderOptions {
        ReaderOptions {
            date_range: Some(DateRange::new(date("2024-03-20"), date("2024-03-21")).unwrap()),
            ..Default::default()
        }
    }

    fn read_system(
        source: &str,
        options: &ReaderOptions,
    ) -> Result<Vec<SystemTransaction>, IngestError> {
        read_system_transactions(source.as_bytes(), options)
    }

    fn read_bank(source: &str, options: &ReaderOptions) -> Result<Vec<BankRecord>, IngestError> {
        read_bank_records(source.as_bytes(), options)
    }

    /// Error message for a system file with the given data rows after the header.
    fn system_error(rows: &str) -> String {
        let source = format!("trxID,amount,type,transactionTime\n{rows}");
        read_system(&source, &ReaderOptions::default())
            .unwrap_err()
            .to_string()
    }

    fn bank_error(rows: &str) -> String {
        let source = format!("uniqueID,amount,date\n{rows}");
        read_bank(&source, &ReaderOptions::default())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn read_rejects_undecodable_header() {
        let source = b"trx\xffID,amount,type,transactionTime\nT1,1,DEBIT,2024-03-20 10:00:00\n";
        let error = read_system_transactions(&source[..], &ReaderOptions::default()).unwrap_err();
        assert!(matches!(error, IngestError::Csv(_)));

        let source = b"unique\xffID,amount,date\nB1,1,2024-03-20\n";
        let error = read_bank_records(&source[..], &ReaderOptions::default()).unwrap_err();
        assert!(matches!(error, IngestError::Csv(_)));
    }

    #[test]
    fn read_system_valid() {
        let source = "\
trxID,amount,type,transactionTime
TX001,100.0,DEBIT,2024-03-20 10:00:00
TX002,200.50,CREDIT,2024-03-21 15:30:00
";
        let transactions = read_system(source, &ReaderOptions::default()).unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].id, "TX001");
        assert_eq!(transactions[0].amount, Decimal::from_str("100.0").unwrap());
        assert_eq!(transactions[0].direction, Direction::Debit);
        assert_eq!(
            transactions[1].timestamp,
            NaiveDateTime::parse_from_str("2024-03-21 15:30:00", SYSTEM_TIMESTAMP_FORMAT).unwrap()
        );
        assert_eq!(transactions[1].direction, Direction::Credit);
    }

    #[test]
    fn read_system_without_header() {
        let source = "TX001,100.0,DEBIT,2024-03-20 10:00:00\n";
        let options = ReaderOptions {
            skip_header: false,
            ..Default::default()
        };

        let transactions = read_system(source, &options).unwrap();
        assert_eq!(transactions.len(), 1);
    }

    #[test]
    fn read_system_empty() {
        assert!(read_system("", &ReaderOptions::default()).unwrap().is_empty());
        assert!(
            read_system("trxID,amount,type,transactionTime\n", &ReaderOptions::default())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn read_system_filters_by_date_range() {
        let source = "\
trxID,amount,type,transactionTime
TX001,100.0,DEBIT,2024-03-19 23:59:59
TX002,200.0,CREDIT,2024-03-20 00:00:00
TX003,300.0,CREDIT,2024-03-21 23:59:59
TX004,400.0,DEBIT,2024-03-22 00:00:00
";
        let transactions = read_system(source, &march_20_to_21()).unwrap();

        let ids: Vec<_> = transactions.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["TX002", "TX003"]);
    }

    #[test]
    fn read_system_negative_amount() {
        let error = system_error("TX001,-100.0,DEBIT,2024-03-20 10:00:00\n");
        assert_eq!(error, "negative amount [-100.0] in row 2 of file");
    }

    #[test]
    fn read_system_invalid_amount() {
        let error = system_error("TX001,invalid,DEBIT,2024-03-20 10:00:00\n");
        assert_eq!(error, "invalid amount [invalid] in row 2 of file");
    }

    #[test]
    fn read_system_invalid_date() {
        let error = system_error("TX001,100.0,DEBIT,invalid-date\n");
        assert_eq!(error, "invalid date [invalid-date] in row 2 of file");
    }

    #[test]
    fn read_system_date_without_time() {
        let error = system_error("TX001,100.0,DEBIT,2024-03-20\n");
        assert_eq!(error, "invalid date [2024-03-20] in row 2 of file");
    }

    #[test]
    fn read_system_invalid_direction() {
        let error = system_error("TX001,100.0,TRANSFER,2024-03-20 10:00:00\n");
        assert_eq!(error, "invalid transaction type [TRANSFER] in row 2 of file");
    }

    #[test]
    fn read_system_invalid_format() {
        let error = system_error("TX001,100.0,DEBIT\n");
        assert_eq!(error, "invalid format [TX001,100.0,DEBIT] in row 2 of file");
    }

    #[test]
    fn read_system_reports_later_rows() {
        let error = system_error(
            "\
TX001,1.00,DEBIT,2024-03-20 10:00:00
TX002,1.00,DEBIT,2024-03-20 10:00:00
TX003,1.00,DEBIT,2024-03-20 10:00:00,extra
",
        );
        assert_eq!(
            error,
            "invalid format [TX003,1.00,DEBIT,2024-03-20 10:00:00,extra] in row 4 of file"
        );
    }

    #[test]
    fn read_system_row_numbers_without_header() {
        let options = ReaderOptions {
            skip_header: false,
            ..Default::default()
        };
        let error = read_system("TX001,oops,DEBIT,2024-03-20 10:00:00\n", &options)
            .unwrap_err()
            .to_string();
        assert_eq!(error, "invalid amount [oops] in row 1 of file");
    }

    #[test]
    fn read_system_rejects_rows_outside_range_only_after_validation() {
        let source = "trxID,amount,type,transactionTime\nTX001,-1.00,DEBIT,2020-01-01 00:00:00\n";
        let error = read_system(source, &march_20_to_21()).unwrap_err();
        assert!(matches!(error, IngestError::NegativeAmount { row: 2, .. }));
    }

    #[test]
    fn read_system_accepts_zero_amount() {
        let source = "\
trxID,amount,type,transactionTime
TX001,0.00,DEBIT,2024-03-20 10:00:00
TX002,-0,CREDIT,2024-03-20 10:00:00
";
        let transactions = read_system(source, &ReaderOptions::default()).unwrap();
        assert_eq!(transactions.len(), 2);
    }

    #[test]
    fn read_bank_valid() {
        let source = "\
uniqueID,amount,date
BS001,-100.0,2024-03-20
BS002,200.5,2024-03-21
";
        let options = ReaderOptions {
            source_label: Some("BCA".to_owned()),
            ..Default::default()
        };
        let records = read_bank(source, &options).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "BS001");
        assert_eq!(records[0].amount, Decimal::from_str("-100.0").unwrap());
        assert_eq!(records[0].date, date("2024-03-20"));
        assert!(records.iter().all(|r| r.source_label == "BCA"));
    }

    #[test]
    fn read_bank_filters_by_date_range() {
        let source = "\
uniqueID,amount,date
BS001,-100.0,2024-03-19
BS002,200.5,2024-03-20
BS003,10,2024-03-21
BS004,10,2024-03-22
";
        let records = read_bank(source, &march_20_to_21()).unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["BS002", "BS003"]);
    }

    #[test]
    fn read_bank_invalid_amount() {
        let error = bank_error("BS001,invalid,2024-03-20\n");
        assert_eq!(error, "invalid amount [invalid] in row 2 of file");
    }

    #[test]
    fn read_bank_invalid_date() {
        let error = bank_error("BS001,100.0,invalid-date\n");
        assert_eq!(error, "invalid date [invalid-date] in row 2 of file");
    }

    #[test]
    fn read_bank_invalid_format() {
        let error = bank_error("BS001,100.0\n");
        assert_eq!(error, "invalid format [BS001,100.0] in row 2 of file");
    }

    #[test]
    fn read_bank_allows_negative_amounts() {
        let records = read_bank(
            "uniqueID,amount,date\nBS001,-0.01,2024-03-20\n",
            &ReaderOptions::default(),
        )
        .unwrap();
        assert_eq!(records[0].amount, Decimal::from_str("-0.01").unwrap());
        assert_eq!(records[0].source_label, "");
    }

    #[test]
    fn read_bank_quoted_fields() {
        let records = read_bank(
            "uniqueID,amount,date\n\"BS,001\",\"1500.00\",2024-03-20\n",
            &ReaderOptions::default(),
        )
        .unwrap();
        assert_eq!(records[0].id, "BS,001");
    }
}
