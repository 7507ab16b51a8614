//! Account records
//!
//! An account owns the three balance pools and the running investment total.
//! Only the ledger mutates the balance fields; everything else here is plain
//! data plus the read-only views handed to the gateway.

pub mod models;

pub use models::{Account, AccountDraft, AccountView, LedgerFields, Pool, Role, WalletSummary};

use crate::error::{CoreError, CoreResult};

/// Trim and lower-case an email address, rejecting obvious garbage.
pub fn normalize_email(email: &str) -> CoreResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(CoreError::InvalidInput(format!(
            "'{}' is not a valid email address",
            email
        ))),
    }
}
