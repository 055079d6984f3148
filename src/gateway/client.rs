use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use sqlx::types::BigDecimal;
use std::time::Duration;

use super::{ChargeVerification, GatewayError, PaymentGateway};

/// Envelope the gateway wraps every API response in.
#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    status: String,
    amount: Option<BigDecimal>,
}

/// HTTP client for the payment gateway's verify API.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl GatewayClient {
    pub fn new(base_url: String, secret_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        GatewayClient {
            client,
            base_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification, GatewayError> {
        let url = format!(
            "{}/transaction/verify/{}",
            self.base_url.trim_end_matches('/'),
            reference
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::ChargeNotFound(reference.to_string()));
        }

        let envelope: VerifyEnvelope = response.json().await?;

        if !envelope.status {
            return Err(GatewayError::InvalidResponse(
                envelope
                    .message
                    .unwrap_or_else(|| "gateway reported failure".to_string()),
            ));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::InvalidResponse("missing data object".to_string()))?;

        Ok(ChargeVerification {
            reference: data.reference,
            status: data.status,
            amount: data.amount,
        })
    }
}
