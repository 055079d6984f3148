//! Transaction state machine and reconciliation vocabulary.
//!
//! Status moves forward only: `initialized -> processing -> {success, failed}`.
//! Once a terminal status is reached the row is immutable except for
//! metadata enrichment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxPurpose {
    WalletFunding,
    DataPurchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tx_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Initialized,
    Processing,
    Success,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    /// Re-asserting the current status is allowed (webhook redelivery).
    pub fn can_transition(self, next: TxStatus) -> bool {
        match (self, next) {
            (a, b) if a == b => true,
            (TxStatus::Initialized, TxStatus::Processing) => true,
            (TxStatus::Initialized, TxStatus::Success) => true,
            (TxStatus::Initialized, TxStatus::Failed) => true,
            (TxStatus::Processing, TxStatus::Success) => true,
            (TxStatus::Processing, TxStatus::Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxStatus::Initialized => "initialized",
            TxStatus::Processing => "processing",
            TxStatus::Success => "success",
            TxStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The outcome a confirmation channel reports for a transaction.
/// `Pending` means the counterparty has not reached a terminal state yet
/// and the local row must not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Success,
    Failed,
    Pending,
}

impl SettlementOutcome {
    /// Map the fulfillment provider's free-form status vocabulary onto the
    /// local tri-state. Unknown strings return `None` so callers can log
    /// them instead of silently treating them as pending.
    pub fn from_provider_status(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delivered" | "completed" | "success" | "fulfilled" | "resolved" => {
                Some(SettlementOutcome::Success)
            }
            "failed" | "cancelled" | "refunded" | "error" => Some(SettlementOutcome::Failed),
            "pending" | "processing" | "queued" | "initiated" => Some(SettlementOutcome::Pending),
            _ => None,
        }
    }

    /// Map the payment gateway's charge status onto the local tri-state.
    pub fn from_gateway_status(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Some(SettlementOutcome::Success),
            "failed" | "abandoned" | "reversed" => Some(SettlementOutcome::Failed),
            "pending" | "ongoing" | "processing" => Some(SettlementOutcome::Pending),
            _ => None,
        }
    }

    pub fn as_status(self) -> Option<TxStatus> {
        match self {
            SettlementOutcome::Success => Some(TxStatus::Success),
            SettlementOutcome::Failed => Some(TxStatus::Failed),
            SettlementOutcome::Pending => None,
        }
    }
}

/// Non-destructive metadata merge: keys already present on the row win,
/// new keys from the patch are added. Commutative for fields that each
/// channel sets exactly once, so webhook arrival order does not matter.
pub fn merge_metadata(
    existing: &serde_json::Value,
    patch: &serde_json::Value,
) -> serde_json::Value {
    let mut merged = match existing {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };

    if let serde_json::Value::Object(patch_map) = patch {
        for (key, value) in patch_map {
            merged.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    serde_json::Value::Object(merged)
}
