//! Type definitions for the transaction monitoring pipeline

pub mod alert;
pub mod transaction;

pub use alert::{Alert, AlertKind, Severity};
pub use transaction::{RawTransaction, TransactionRecord};
