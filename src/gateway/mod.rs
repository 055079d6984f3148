//! Payment gateway collaborator. Consulted by the reconciler's verify
//! channel; never mutates ledger state itself.

pub mod client;

pub use client::GatewayClient;

use async_trait::async_trait;
use sqlx::types::BigDecimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("charge not found for reference {0}")]
    ChargeNotFound(String),
    #[error("invalid response from gateway: {0}")]
    InvalidResponse(String),
}

/// What the gateway reports about a charge. `status` stays in the
/// gateway's vocabulary; mapping to local outcomes happens in the
/// reconciler.
#[derive(Debug, Clone)]
pub struct ChargeVerification {
    pub reference: String,
    pub status: String,
    pub amount: Option<BigDecimal>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification, GatewayError>;
}
