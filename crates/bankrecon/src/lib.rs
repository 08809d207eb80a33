//! Reconcile system-of-record transactions against bank statement exports.

pub mod ingest;
pub mod model;
pub mod reconcile;
pub mod report;

pub type Decimal = rust_decimal::Decimal;

pub use anyhow::Result;
pub use model::{BankRecord, DateRange, Direction, SystemTransaction};
pub use reconcile::{ReconcileResult, Unmatched, reconcile};
