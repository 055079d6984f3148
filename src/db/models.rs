use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::domain::transaction::{TxKind, TxPurpose, TxStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub user_id: Uuid,
    pub balance: BigDecimal,
    pub blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ledger entry. `reference` is the globally unique join key every
/// confirmation channel uses to find this row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TxKind,
    pub purpose: TxPurpose,
    pub amount: BigDecimal,
    pub status: TxStatus,
    pub reference: String,
    pub provider_order_id: Option<String>,
    pub provider_reference: Option<String>,
    pub recipient: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn new(
        user_id: Uuid,
        kind: TxKind,
        purpose: TxPurpose,
        amount: BigDecimal,
        status: TxStatus,
        reference: String,
        recipient: Option<String>,
        metadata: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            purpose,
            amount,
            status,
            reference,
            provider_order_id: None,
            provider_reference: None,
            recipient,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub name: String,
    pub network: String,
    pub provider_code: String,
    pub price: BigDecimal,
    pub data_mb: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
