//! Balance Ledger
//!
//! Multi-pool balances, the immutable transaction log and the crash
//! consistency protocol that keeps the two in step.

pub mod models;
pub mod recovery;
pub mod service;

pub use models::{DebitOutcome, PositionWrite, Posting, Transaction, TransactionKind, TxnStatus};
pub use recovery::RecoveryReport;
pub use service::{AccountSession, LEDGER_TARGET, Ledger};
