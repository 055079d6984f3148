//! Balance mutation and settlement idempotency.
//!
//! `apply_delta` is the sole authorized writer of `accounts.balance`. It
//! runs inside a caller-owned sqlx transaction so the row lock, the balance
//! write, and the paired transaction-status write commit or roll back as
//! one unit.

use sqlx::types::BigDecimal;
use sqlx::{Postgres, Transaction as SqlxTransaction};
use thiserror::Error;
use uuid::Uuid;

use crate::db::queries;
use crate::error::AppError;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("account {0} does not exist")]
    UnknownAccount(Uuid),

    #[error("account {0} is blocked")]
    AccountBlocked(Uuid),

    #[error("debit would drive balance negative")]
    InsufficientBalance,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownAccount(id) => AppError::NotFound(format!("account {}", id)),
            LedgerError::AccountBlocked(_) => AppError::AccountBlocked,
            LedgerError::InsufficientBalance => AppError::InsufficientBalance,
            LedgerError::Database(e) => AppError::Database(e),
        }
    }
}

/// Apply a signed balance delta to an account under its row lock.
/// Positive deltas credit, negative deltas debit. A debit that would drive
/// the balance below zero is rejected before any write. Returns the new
/// balance.
pub async fn apply_delta(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    delta: &BigDecimal,
) -> Result<BigDecimal, LedgerError> {
    let account = queries::lock_account(executor, user_id)
        .await?
        .ok_or(LedgerError::UnknownAccount(user_id))?;

    if account.blocked {
        return Err(LedgerError::AccountBlocked(user_id));
    }

    let new_balance = &account.balance + delta;
    if new_balance < BigDecimal::from(0) {
        return Err(LedgerError::InsufficientBalance);
    }

    queries::write_balance(executor, user_id, &new_balance).await?;
    Ok(new_balance)
}

/// Idempotency guard: true iff the transaction carrying `reference` has
/// already reached a terminal status. Must be called inside the same locked
/// transaction as the balance write it guards, so check and write cannot
/// race.
pub async fn already_settled(
    executor: &mut SqlxTransaction<'_, Postgres>,
    reference: &str,
) -> Result<bool, LedgerError> {
    let tx = queries::lock_transaction_by_reference(executor, reference).await?;
    Ok(tx.map(|t| t.status.is_terminal()).unwrap_or(false))
}
