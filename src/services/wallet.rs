//! Deposit initialization: the credit half of the ledger starts life here
//! as an `initialized` transaction that a later gateway confirmation
//! settles.

use sqlx::PgPool;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::db::models::LedgerTransaction;
use crate::db::queries;
use crate::domain::transaction::{TxKind, TxPurpose, TxStatus};
use crate::error::AppError;
use crate::validation;

#[derive(Clone)]
pub struct WalletService {
    pool: PgPool,
}

impl WalletService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the local `initialized` credit row for a deposit. The
    /// metadata snapshot of `user_id` and `requested_amount` is what the
    /// reconciler recovers when the gateway webhook arrives.
    pub async fn initialize_deposit(
        &self,
        user_id: Uuid,
        amount: BigDecimal,
    ) -> Result<LedgerTransaction, AppError> {
        validation::validate_amount("amount", &amount)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let account = queries::get_account(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {}", user_id)))?;

        if account.blocked {
            return Err(AppError::AccountBlocked);
        }

        let reference = format!("DEP-{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({
            "user_id": user_id.to_string(),
            "requested_amount": amount.to_string(),
        });

        let tx = LedgerTransaction::new(
            user_id,
            TxKind::Credit,
            TxPurpose::WalletFunding,
            amount,
            TxStatus::Initialized,
            reference,
            None,
            metadata,
        );

        let mut db = self.pool.begin().await?;
        let inserted = queries::upsert_transaction(&mut db, &tx).await?;
        db.commit().await?;

        tracing::info!(
            reference = %inserted.reference,
            user_id = %user_id,
            amount = %inserted.amount,
            "deposit initialized"
        );

        Ok(inserted)
    }

    pub async fn get_by_reference(
        &self,
        reference: &str,
    ) -> Result<LedgerTransaction, AppError> {
        queries::get_transaction_by_reference(&self.pool, reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", reference)))
    }
}
