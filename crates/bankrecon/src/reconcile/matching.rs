use rust_decimal::RoundingStrategy;

use crate::{BankRecord, Decimal, Direction, SystemTransaction};

/// Largest amount difference, after rounding to cents, that still counts as a match.
pub const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Absolute difference between the system magnitude and the bank magnitude, rounded to cents.
pub fn amount_discrepancy(system: &SystemTransaction, bank: &BankRecord) -> Decimal {
    (system.amount - bank.amount.abs())
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn sign_agrees(direction: Direction, bank_amount: Decimal) -> bool {
    // zero is acceptable on either side
    match direction {
        Direction::Debit => bank_amount <= Decimal::ZERO,
        Direction::Credit => bank_amount >= Decimal::ZERO,
    }
}

pub fn system_matches_bank(system: &SystemTransaction, bank: &BankRecord) -> bool {
    if !sign_agrees(system.direction, bank.amount) {
        return false;
    }

    if amount_discrepancy(system, bank) > AMOUNT_TOLERANCE {
        return false;
    }

    // time of day is irrelevant, bank statements only carry the date
    system.date() == bank.date
}
