//! Rendering a [`ReconcileResult`] as JSON or as a human readable summary.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anstyle::{AnsiColor, Color, Style};
use anyhow::Context;
use rust_decimal::RoundingStrategy;
use serde::Serialize;

use crate::{BankRecord, Decimal, ReconcileResult, Result, SystemTransaction};

fn cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_transactions_processed: usize,
    pub total_transactions_matched: usize,
    pub total_transactions_unmatched: usize,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_discrepancies: Decimal,
}

#[derive(Debug, Serialize)]
pub struct UnmatchedDetails<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system_transactions: Vec<&'a SystemTransaction>,
    /// Keyed by bank name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bank_statements: BTreeMap<&'a str, Vec<&'a BankRecord>>,
}

/// The JSON document written by `--output`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub summary: Summary,
    pub unmatched_details: UnmatchedDetails<'a>,
}

impl<'a> Report<'a> {
    pub fn from_result(result: &'a ReconcileResult) -> Self {
        Report {
            summary: Summary {
                total_transactions_processed: result.processed_count,
                total_transactions_matched: result.matched_count,
                total_transactions_unmatched: result.unmatched.count,
                total_discrepancies: cents(result.discrepancy_total),
            },
            unmatched_details: UnmatchedDetails {
                system_transactions: result.unmatched.system.iter().collect(),
                bank_statements: result.unmatched_bank_by_source(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to encode JSON")
    }
}

/// Write the JSON report for `result` to `path`, replacing any existing file.
pub fn write_json(result: &ReconcileResult, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &Report::from_result(result))
        .context("Failed to encode JSON")?;
    writeln!(writer)?;
    writer.flush()?;

    tracing::info!(file = %path.display(), "wrote reconciliation report");
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Styles {
    pub heading: Style,
    pub system: Style,
    pub bank: Style,
}

impl Styles {
    pub fn colored() -> Self {
        Styles {
            heading: Style::new().bold(),
            system: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
            bank: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))),
        }
    }
}

/// Human readable summary, optionally with terminal colors.
pub struct TextReport<'a> {
    result: &'a ReconcileResult,
    styles: Styles,
}

impl<'a> TextReport<'a> {
    pub fn new(result: &'a ReconcileResult, styles: Styles) -> Self {
        TextReport { result, styles }
    }
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let Styles {
            heading,
            system,
            bank,
        } = self.styles;

        writeln!(f, "{heading}Reconciliation Summary:{heading:#}")?;
        writeln!(f, "------------------------")?;
        writeln!(f, "Total transactions processed: {}", result.processed_count)?;
        writeln!(f, "Total matched transactions: {}", result.matched_count)?;
        writeln!(f, "Total unmatched transactions: {}", result.unmatched.count)?;

        if !result.unmatched.system.is_empty() {
            writeln!(f)?;
            writeln!(f, "{system}System transactions missing from bank statements:{system:#}")?;
            for transaction in &result.unmatched.system {
                writeln!(
                    f,
                    "- TrxID: {}, Amount: {:.2}, Type: {}, Date: {}",
                    transaction.id,
                    cents(transaction.amount),
                    transaction.direction,
                    transaction.timestamp
                )?;
            }
        }

        if !result.unmatched.bank.is_empty() {
            writeln!(f)?;
            writeln!(f, "{bank}Bank statements missing from system transactions:{bank:#}")?;
            for (label, records) in result.unmatched_bank_by_source() {
                writeln!(f)?;
                writeln!(f, "Bank: {label}")?;
                for record in records {
                    writeln!(
                        f,
                        "- ID: {}, Amount: {:.2}, Date: {}",
                        record.id,
                        cents(record.amount),
                        record.date
                    )?;
                }
            }
        }

        writeln!(f)?;
        write!(
            f,
            "Total amount discrepancies: {:.2}",
            cents(result.discrepancy_total)
        )
    }
}

impl fmt::Display for ReconcileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&TextReport::new(self, Styles::default()), f)
    }
}
