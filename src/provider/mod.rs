//! Fulfillment provider collaborator — the upstream data-bundle vendor.
//! Consulted after funds are reserved; delivery confirmation arrives later
//! through its webhook.

pub mod client;

pub use client::VendClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("provider rejected order: {0}")]
    Rejected(String),
    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
    #[error("circuit breaker open")]
    CircuitBreakerOpen,
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::ProviderUnavailable(err.to_string())
    }
}

/// Order details handed to the provider once the debit has committed.
#[derive(Debug, Clone)]
pub struct VendOrder {
    pub reference: String,
    pub provider_code: String,
    pub recipient: String,
}

/// What the provider acknowledged at order time. Delivery status is not
/// final here; the terminal outcome arrives via webhook.
#[derive(Debug, Clone)]
pub struct VendReceipt {
    pub order_id: String,
    pub provider_reference: Option<String>,
    pub status: String,
}

#[async_trait]
pub trait FulfillmentProvider: Send + Sync {
    async fn place_order(&self, order: &VendOrder) -> Result<VendReceipt, ProviderError>;
}
