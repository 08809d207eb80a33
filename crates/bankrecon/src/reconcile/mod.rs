//! Pairing system transactions with bank statement records.

pub mod matching;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{BankRecord, Decimal, SystemTransaction};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Unmatched {
    /// `system.len() + bank.len()`
    pub count: usize,
    pub system: Vec<SystemTransaction>,
    pub bank: Vec<BankRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileResult {
    /// Number of system transactions considered. Surplus bank records are not counted.
    pub processed_count: usize,
    pub matched_count: usize,
    /// Sum of the rounded amount differences of all matched pairs.
    pub discrepancy_total: Decimal,
    pub unmatched: Unmatched,
}

impl ReconcileResult {
    /// Unmatched bank records grouped by the bank they came from, in input order per bank.
    pub fn unmatched_bank_by_source(&self) -> BTreeMap<&str, Vec<&BankRecord>> {
        let mut groups: BTreeMap<&str, Vec<&BankRecord>> = BTreeMap::new();
        for record in &self.unmatched.bank {
            groups
                .entry(record.source_label.as_str())
                .or_default()
                .push(record);
        }
        groups
    }
}

/// Match every system transaction against the first unused bank record that satisfies
/// [`matching::system_matches_bank`], scanning both sides in input order.
///
/// Ties between equally good candidates are resolved by input order, not by the size of
/// the discrepancy. Each bank record is used at most once.
pub fn reconcile(system: &[SystemTransaction], bank: &[BankRecord]) -> ReconcileResult {
    tracing::debug!(
        system = system.len(),
        bank = bank.len(),
        "reconciling transactions"
    );

    // Only same-day records can match, so scanning a date bucket in input order
    // yields the same pairing as scanning the whole statement.
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (index, record) in bank.iter().enumerate() {
        by_date.entry(record.date).or_default().push(index);
    }

    let mut bank_matched = vec![false; bank.len()];
    let mut result = ReconcileResult {
        processed_count: system.len(),
        ..Default::default()
    };

    for transaction in system {
        let candidates = by_date.get(&transaction.date()).map(Vec::as_slice);
        let matched_at = candidates.unwrap_or_default().iter().copied().find(|&index| {
            !bank_matched[index] && matching::system_matches_bank(transaction, &bank[index])
        });

        match matched_at {
            Some(index) => {
                bank_matched[index] = true;
                result.matched_count += 1;
                result.discrepancy_total += matching::amount_discrepancy(transaction, &bank[index]);
            }
            None => result.unmatched.system.push(transaction.clone()),
        }
    }

    result.unmatched.bank = bank
        .iter()
        .zip(&bank_matched)
        .filter(|(_, matched)| !**matched)
        .map(|(record, _)| record.clone())
        .collect();
    result.unmatched.count = result.unmatched.system.len() + result.unmatched.bank.len();

    tracing::info!(
        processed = result.processed_count,
        matched = result.matched_count,
        unmatched = result.unmatched.count,
        discrepancies = %result.discrepancy_total,
        "reconciliation finished"
    );

    result
}
