//! Purchase orchestration: reserve funds, record the order, hand off to
//! the fulfillment provider.
//!
//! The debit commits before the provider is called. A failed or timed-out
//! provider call does NOT roll the reservation back; the order stays
//! `processing` and the provider's delivery webhook (or a failed outcome
//! releasing the hold) resolves it later.

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::LedgerTransaction;
use crate::db::queries;
use crate::domain::transaction::{TxKind, TxPurpose, TxStatus};
use crate::error::AppError;
use crate::ledger;
use crate::provider::{FulfillmentProvider, VendOrder};
use crate::validation;

#[derive(Debug)]
pub enum PurchaseOutcome {
    /// Provider acknowledged the order synchronously. Delivery is still
    /// pending; final status arrives via the provider webhook.
    Placed {
        transaction: LedgerTransaction,
        order_id: String,
    },
    /// Funds reserved but the provider call failed or timed out. The
    /// caller is told the order is accepted and delayed.
    AcceptedPending { transaction: LedgerTransaction },
}

#[derive(Clone)]
pub struct PurchaseService {
    pool: PgPool,
    provider: Arc<dyn FulfillmentProvider>,
}

impl PurchaseService {
    pub fn new(pool: PgPool, provider: Arc<dyn FulfillmentProvider>) -> Self {
        Self { pool, provider }
    }

    pub async fn purchase(
        &self,
        user_id: Uuid,
        bundle_id: Uuid,
        recipient_phone: &str,
    ) -> Result<PurchaseOutcome, AppError> {
        validation::validate_recipient_phone(recipient_phone)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let reference = format!("ORD-{}", Uuid::new_v4().simple());

        // Reservation: debit and transaction row commit atomically. An
        // insufficient balance aborts here with no row written.
        let mut db = self.pool.begin().await?;

        let bundle = queries::get_active_bundle(&mut db, bundle_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("bundle {}", bundle_id)))?;

        ledger::apply_delta(&mut db, user_id, &(-bundle.price.clone())).await?;

        let tx = LedgerTransaction::new(
            user_id,
            TxKind::Debit,
            TxPurpose::DataPurchase,
            bundle.price.clone(),
            TxStatus::Processing,
            reference.clone(),
            Some(recipient_phone.to_string()),
            serde_json::json!({
                "bundle_id": bundle_id.to_string(),
                "bundle_name": bundle.name,
                "network": bundle.network,
            }),
        );
        let inserted = queries::upsert_transaction(&mut db, &tx).await?;

        db.commit().await?;

        tracing::info!(
            reference = %reference,
            user_id = %user_id,
            amount = %bundle.price,
            "funds reserved for data purchase"
        );

        // Hand-off happens only after the reservation is durable.
        let order = VendOrder {
            reference: reference.clone(),
            provider_code: bundle.provider_code,
            recipient: recipient_phone.to_string(),
        };

        match self.provider.place_order(&order).await {
            Ok(receipt) => {
                let mut db = self.pool.begin().await?;
                queries::set_provider_identifiers(
                    &mut db,
                    inserted.id,
                    Some(&receipt.order_id),
                    receipt.provider_reference.as_deref(),
                )
                .await?;
                db.commit().await?;

                tracing::info!(
                    reference = %reference,
                    order_id = %receipt.order_id,
                    provider_status = %receipt.status,
                    "provider accepted order"
                );

                let transaction = queries::get_transaction_by_reference(&self.pool, &reference)
                    .await?
                    .ok_or_else(|| AppError::Internal("reserved transaction vanished".to_string()))?;

                Ok(PurchaseOutcome::Placed {
                    transaction,
                    order_id: receipt.order_id,
                })
            }
            Err(e) => {
                // Reserve-first policy: the deduction stands, the order
                // stays `processing` for the reconciler to resolve.
                tracing::warn!(
                    reference = %reference,
                    error = %e,
                    "provider call failed after reservation, order accepted as pending"
                );

                Ok(PurchaseOutcome::AcceptedPending {
                    transaction: inserted,
                })
            }
        }
    }
}
