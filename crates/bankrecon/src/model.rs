use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{Decimal, Result};

/// Whether money left (`Debit`) or entered (`Credit`) the account.
///
/// The system of record stores unsigned magnitudes plus this tag, while banks
/// sign their amounts: outflows negative, inflows positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Debit => "DEBIT",
            Direction::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction type '{}'", self.0)
    }
}

impl std::error::Error for UnknownDirection {}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(Direction::Debit),
            "CREDIT" => Ok(Direction::Credit),
            other => Err(UnknownDirection(other.to_owned())),
        }
    }
}

/// A transaction as recorded by the internal system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemTransaction {
    pub id: String,
    /// Unsigned magnitude; ingestion rejects negative values.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub direction: Direction,
    pub timestamp: NaiveDateTime,
}

impl SystemTransaction {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A line from a bank statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankRecord {
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Name of the bank the record was exported from, derived from its file.
    pub source_label: String,
    pub date: NaiveDate,
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            anyhow::bail!("end date cannot be before start date");
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
