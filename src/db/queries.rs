use sqlx::{PgPool, Postgres, Result, Transaction as SqlxTransaction};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::db::models::{Account, Bundle, LedgerTransaction};
use crate::domain::transaction::TxStatus;

// --- Account queries ---

/// Take the pessimistic row lock on an account. Every balance-affecting
/// path goes through this before reading the balance.
pub async fn lock_account(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **executor)
        .await
}

pub async fn write_balance(
    executor: &mut SqlxTransaction<'_, Postgres>,
    user_id: Uuid,
    new_balance: &BigDecimal,
) -> Result<()> {
    sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(new_balance)
        .bind(user_id)
        .execute(&mut **executor)
        .await?;
    Ok(())
}

pub async fn create_account(pool: &PgPool, user_id: Uuid) -> Result<Account> {
    sqlx::query_as::<_, Account>(
        "INSERT INTO accounts (user_id) VALUES ($1) RETURNING *",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

pub async fn get_account(pool: &PgPool, user_id: Uuid) -> Result<Option<Account>> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

// --- Transaction queries ---

/// Insert a ledger transaction, or absorb into an existing still-pending
/// row with the same reference. Provider identifiers and metadata merge
/// instead of overwriting, so creation and a racing confirmation converge
/// on the same row regardless of arrival order. Returns the row as stored;
/// a terminal row with the same reference is returned untouched.
pub async fn upsert_transaction(
    executor: &mut SqlxTransaction<'_, Postgres>,
    tx: &LedgerTransaction,
) -> Result<LedgerTransaction> {
    let upserted = sqlx::query_as::<_, LedgerTransaction>(
        r#"
        INSERT INTO transactions (
            id, user_id, kind, purpose, amount, status, reference,
            provider_order_id, provider_reference, recipient, metadata,
            created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (reference) DO UPDATE SET
            provider_order_id = COALESCE(transactions.provider_order_id, EXCLUDED.provider_order_id),
            provider_reference = COALESCE(transactions.provider_reference, EXCLUDED.provider_reference),
            recipient = COALESCE(transactions.recipient, EXCLUDED.recipient),
            metadata = EXCLUDED.metadata || transactions.metadata,
            updated_at = NOW()
        WHERE transactions.status IN ('initialized', 'processing')
        RETURNING *
        "#,
    )
    .bind(tx.id)
    .bind(tx.user_id)
    .bind(tx.kind)
    .bind(tx.purpose)
    .bind(&tx.amount)
    .bind(tx.status)
    .bind(&tx.reference)
    .bind(&tx.provider_order_id)
    .bind(&tx.provider_reference)
    .bind(&tx.recipient)
    .bind(&tx.metadata)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .fetch_optional(&mut **executor)
    .await?;

    match upserted {
        Some(row) => Ok(row),
        // Conflict against an already-terminal row: the guard WHERE clause
        // suppressed the update, return the row as-is.
        None => {
            sqlx::query_as::<_, LedgerTransaction>(
                "SELECT * FROM transactions WHERE reference = $1",
            )
            .bind(&tx.reference)
            .fetch_one(&mut **executor)
            .await
        }
    }
}

pub async fn get_transaction_by_reference(
    pool: &PgPool,
    reference: &str,
) -> Result<Option<LedgerTransaction>> {
    sqlx::query_as::<_, LedgerTransaction>("SELECT * FROM transactions WHERE reference = $1")
        .bind(reference)
        .fetch_optional(pool)
        .await
}

/// Locked read by reference, inside the caller's transaction.
pub async fn lock_transaction_by_reference(
    executor: &mut SqlxTransaction<'_, Postgres>,
    reference: &str,
) -> Result<Option<LedgerTransaction>> {
    sqlx::query_as::<_, LedgerTransaction>(
        "SELECT * FROM transactions WHERE reference = $1 FOR UPDATE",
    )
    .bind(reference)
    .fetch_optional(&mut **executor)
    .await
}

/// The provider may echo back the reference, its own order id, or both.
pub async fn find_transaction_for_provider_event(
    pool: &PgPool,
    reference: Option<&str>,
    provider_order_id: Option<&str>,
) -> Result<Option<LedgerTransaction>> {
    sqlx::query_as::<_, LedgerTransaction>(
        r#"
        SELECT * FROM transactions
        WHERE ($1::text IS NOT NULL AND reference = $1)
           OR ($2::text IS NOT NULL AND provider_order_id = $2)
        LIMIT 1
        "#,
    )
    .bind(reference)
    .bind(provider_order_id)
    .fetch_optional(pool)
    .await
}

pub async fn update_status_and_metadata(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    status: TxStatus,
    metadata: &serde_json::Value,
) -> Result<()> {
    sqlx::query(
        "UPDATE transactions SET status = $1, metadata = $2, updated_at = NOW() WHERE id = $3",
    )
    .bind(status)
    .bind(metadata)
    .bind(id)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

/// Record the identifiers the provider assigned to an order. COALESCE keeps
/// whichever side wrote first.
pub async fn set_provider_identifiers(
    executor: &mut SqlxTransaction<'_, Postgres>,
    id: Uuid,
    provider_order_id: Option<&str>,
    provider_reference: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE transactions
        SET provider_order_id = COALESCE(provider_order_id, $1),
            provider_reference = COALESCE(provider_reference, $2),
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(provider_order_id)
    .bind(provider_reference)
    .bind(id)
    .execute(&mut **executor)
    .await?;
    Ok(())
}

// --- Bundle queries ---

pub async fn get_active_bundle(
    executor: &mut SqlxTransaction<'_, Postgres>,
    bundle_id: Uuid,
) -> Result<Option<Bundle>> {
    sqlx::query_as::<_, Bundle>("SELECT * FROM bundles WHERE id = $1 AND active = TRUE")
        .bind(bundle_id)
        .fetch_optional(&mut **executor)
        .await
}
