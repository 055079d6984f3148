//! Settlement reconciliation: merges confirmations from the verify call,
//! the gateway webhook, and the provider webhook into transaction-status
//! transitions.
//!
//! All three channels funnel into [`Reconciler::settle`], which holds the
//! account row lock across the idempotency check, the balance effect, and
//! the status write.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::PgPool;
use sqlx::types::BigDecimal;

use crate::db::models::LedgerTransaction;
use crate::db::queries;
use crate::domain::transaction::{SettlementOutcome, TxKind, TxStatus, merge_metadata};
use crate::error::AppError;
use crate::gateway::PaymentGateway;
use crate::ledger;

/// Gateway webhook body: `{ event, data: { reference, amount, metadata } }`.
/// `metadata` echoes what deposit-initialization stored with the charge.
#[derive(Debug, Deserialize)]
pub struct GatewayEvent {
    pub event: String,
    pub data: GatewayEventData,
}

#[derive(Debug, Deserialize)]
pub struct GatewayEventData {
    pub reference: String,
    pub amount: Option<BigDecimal>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Provider webhook body.
#[derive(Debug, Deserialize)]
pub struct ProviderEvent {
    pub event: String,
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    pub reference: Option<String>,
    pub status: String,
    pub recipient: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SettleResult {
    /// Status moved to the given terminal state; any balance effect applied.
    Applied(TxStatus),
    /// Transaction was already terminal; only metadata was enriched.
    AlreadySettled,
    /// Outcome was still pending or the transition was not legal; only
    /// metadata was enriched.
    NoChange,
    /// No transaction carries this reference.
    NotFound,
}

#[derive(Clone)]
pub struct Reconciler {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
}

impl Reconciler {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { pool, gateway }
    }

    /// The single transition function behind every confirmation channel.
    ///
    /// Locks the owning account, runs the idempotency guard inside that
    /// lock scope, applies the balance effect exactly once (credit on
    /// success; debit reservation release on failure), and flips the
    /// status forward. Terminal rows only absorb metadata.
    pub async fn settle(
        &self,
        reference: &str,
        outcome: SettlementOutcome,
        metadata_patch: &serde_json::Value,
    ) -> Result<SettleResult, AppError> {
        let Some(probe) = queries::get_transaction_by_reference(&self.pool, reference).await?
        else {
            return Ok(SettleResult::NotFound);
        };

        let mut db = self.pool.begin().await?;

        // Account lock first: concurrent settle/verify calls for the same
        // user serialize here, so only one applies the balance effect.
        queries::lock_account(&mut db, probe.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("account {}", probe.user_id)))?;

        let settled = ledger::already_settled(&mut db, reference).await.map_err(AppError::from)?;

        let row = queries::lock_transaction_by_reference(&mut db, reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", reference)))?;

        let merged = merge_metadata(&row.metadata, metadata_patch);

        if settled {
            queries::update_status_and_metadata(&mut db, row.id, row.status, &merged).await?;
            db.commit().await?;
            tracing::info!(reference = %reference, status = %row.status, "already settled, event dropped");
            return Ok(SettleResult::AlreadySettled);
        }

        let Some(target) = outcome.as_status() else {
            queries::update_status_and_metadata(&mut db, row.id, row.status, &merged).await?;
            db.commit().await?;
            return Ok(SettleResult::NoChange);
        };

        if !row.status.can_transition(target) {
            tracing::warn!(
                reference = %reference,
                from = %row.status,
                to = %target,
                "illegal status transition requested, ignoring"
            );
            db.rollback().await?;
            return Ok(SettleResult::NoChange);
        }

        match (row.kind, target) {
            // Credit applies its balance effect the moment it first
            // becomes successful.
            (TxKind::Credit, TxStatus::Success) => {
                let new_balance = ledger::apply_delta(&mut db, row.user_id, &row.amount)
                    .await
                    .map_err(AppError::from)?;
                tracing::info!(
                    reference = %reference,
                    amount = %row.amount,
                    new_balance = %new_balance,
                    "wallet credited"
                );
            }
            // A failed debit releases the reservation taken at purchase
            // time, in the same locked transaction as the status flip.
            (TxKind::Debit, TxStatus::Failed) => {
                let new_balance = ledger::apply_delta(&mut db, row.user_id, &row.amount)
                    .await
                    .map_err(AppError::from)?;
                tracing::info!(
                    reference = %reference,
                    amount = %row.amount,
                    new_balance = %new_balance,
                    "debit reservation released"
                );
            }
            // Debit success: funds already left at reservation time.
            // Credit failure: nothing was ever applied.
            _ => {}
        }

        queries::update_status_and_metadata(&mut db, row.id, target, &merged).await?;
        db.commit().await?;

        tracing::info!(reference = %reference, status = %target, "transaction settled");
        Ok(SettleResult::Applied(target))
    }

    /// Gateway webhook channel. Signature verification has already
    /// happened; business mismatches are dropped, never errors.
    pub async fn handle_gateway_event(&self, event: GatewayEvent) -> Result<(), AppError> {
        if event.event != "charge.success" {
            tracing::info!(event = %event.event, "ignoring gateway event type");
            return Ok(());
        }

        let reference = &event.data.reference;

        if let Some(row) = queries::get_transaction_by_reference(&self.pool, reference).await? {
            if let Some(gateway_amount) = &event.data.amount {
                if gateway_amount != &row.amount {
                    tracing::warn!(
                        reference = %reference,
                        local_amount = %row.amount,
                        gateway_amount = %gateway_amount,
                        "gateway-reported amount differs from requested amount"
                    );
                }
            }
        }

        let mut patch = serde_json::Map::new();
        patch.insert(
            "settlement_channel".to_string(),
            serde_json::Value::String("gateway_webhook".to_string()),
        );
        if let Some(amount) = &event.data.amount {
            patch.insert(
                "gateway_amount".to_string(),
                serde_json::Value::String(amount.to_string()),
            );
        }
        if let serde_json::Value::Object(extra) = &event.data.metadata {
            for (k, v) in extra {
                patch.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }

        match self
            .settle(reference, SettlementOutcome::Success, &serde_json::Value::Object(patch))
            .await?
        {
            SettleResult::NotFound => {
                tracing::warn!(reference = %reference, "gateway webhook for unknown reference, dropped");
            }
            result => {
                tracing::debug!(reference = %reference, ?result, "gateway webhook reconciled");
            }
        }

        Ok(())
    }

    /// Provider webhook channel. The transaction may be located by our
    /// reference or by the provider's order id, whichever the event
    /// carries.
    pub async fn handle_provider_event(&self, event: ProviderEvent) -> Result<(), AppError> {
        let Some(row) = queries::find_transaction_for_provider_event(
            &self.pool,
            event.reference.as_deref(),
            event.order_id.as_deref(),
        )
        .await?
        else {
            tracing::warn!(
                reference = ?event.reference,
                order_id = ?event.order_id,
                "provider webhook matches no transaction, dropped"
            );
            return Ok(());
        };

        let Some(outcome) = SettlementOutcome::from_provider_status(&event.status) else {
            tracing::warn!(
                reference = %row.reference,
                raw_status = %event.status,
                "unknown provider status, leaving transaction untouched"
            );
            return Ok(());
        };

        if event.order_id.is_some() || event.reference.is_some() {
            let mut db = self.pool.begin().await?;
            queries::set_provider_identifiers(
                &mut db,
                row.id,
                event.order_id.as_deref(),
                event.reference.as_deref(),
            )
            .await?;
            db.commit().await?;
        }

        let mut patch = serde_json::Map::new();
        patch.insert(
            "provider_status".to_string(),
            serde_json::Value::String(event.status.clone()),
        );
        if let Some(order_id) = &event.order_id {
            patch.insert(
                "provider_order_id".to_string(),
                serde_json::Value::String(order_id.clone()),
            );
        }
        if let Some(recipient) = &event.recipient {
            patch.insert(
                "provider_recipient".to_string(),
                serde_json::Value::String(recipient.clone()),
            );
        }

        let result = self
            .settle(&row.reference, outcome, &serde_json::Value::Object(patch))
            .await?;
        tracing::debug!(reference = %row.reference, ?result, "provider webhook reconciled");

        Ok(())
    }

    /// User-triggered verify channel. If the local row is still pending,
    /// ask the gateway and settle with whatever it reports; a gateway
    /// outage degrades to returning the current local state.
    pub async fn verify_deposit(&self, reference: &str) -> Result<LedgerTransaction, AppError> {
        let row = queries::get_transaction_by_reference(&self.pool, reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", reference)))?;

        if row.is_terminal() {
            return Ok(row);
        }

        let verification = match self.gateway.verify_charge(reference).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(reference = %reference, error = %e, "gateway verify failed, returning local state");
                return Ok(row);
            }
        };

        let Some(outcome) = SettlementOutcome::from_gateway_status(&verification.status) else {
            tracing::warn!(
                reference = %reference,
                raw_status = %verification.status,
                "unknown gateway status, leaving transaction untouched"
            );
            return Ok(row);
        };

        let mut patch = serde_json::Map::new();
        patch.insert(
            "settlement_channel".to_string(),
            serde_json::Value::String("verify".to_string()),
        );
        if let Some(amount) = &verification.amount {
            patch.insert(
                "gateway_amount".to_string(),
                serde_json::Value::String(amount.to_string()),
            );
        }

        self.settle(reference, outcome, &serde_json::Value::Object(patch))
            .await?;

        queries::get_transaction_by_reference(&self.pool, reference)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transaction {}", reference)))
    }
}
