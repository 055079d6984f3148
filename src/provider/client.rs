use async_trait::async_trait;
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{FulfillmentProvider, ProviderError, VendOrder, VendReceipt};

#[derive(Debug, Serialize)]
struct PlaceOrderRequest<'a> {
    reference: &'a str,
    service: &'a str,
    recipient: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlaceOrderResponse {
    #[serde(rename = "orderId")]
    order_id: String,
    reference: Option<String>,
    status: String,
}

/// HTTP client for the vending provider's order API. Calls run through a
/// circuit breaker so a flapping provider stops consuming request budget;
/// a rejected call degrades to the accepted-pending purchase outcome
/// upstream.
#[derive(Clone)]
pub struct VendClient {
    client: Client,
    base_url: String,
    api_key: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl VendClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        VendClient {
            client,
            base_url,
            api_key,
            circuit_breaker,
        }
    }

    pub fn circuit_state(&self) -> &'static str {
        if self.circuit_breaker.is_call_permitted() {
            "closed"
        } else {
            "open"
        }
    }

    async fn place_order_inner(&self, order: &VendOrder) -> Result<VendReceipt, ProviderError> {
        let url = format!("{}/orders", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&PlaceOrderRequest {
                reference: &order.reference,
                service: &order.provider_code,
                recipient: &order.recipient,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!("{}: {}", status, body)));
        }

        let parsed: PlaceOrderResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(VendReceipt {
            order_id: parsed.order_id,
            provider_reference: parsed.reference,
            status: parsed.status,
        })
    }
}

#[async_trait]
impl FulfillmentProvider for VendClient {
    async fn place_order(&self, order: &VendOrder) -> Result<VendReceipt, ProviderError> {
        match self
            .circuit_breaker
            .call(self.place_order_inner(order))
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(FailsafeError::Inner(e)) => Err(e),
            Err(FailsafeError::Rejected) => Err(ProviderError::CircuitBreakerOpen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_place_order_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"OID-991","reference":"PRV-77","status":"processing"}"#)
            .create_async()
            .await;

        let client = VendClient::new(server.url(), "pk_test".to_string());
        let receipt = client
            .place_order(&VendOrder {
                reference: "ORD-1".to_string(),
                provider_code: "mtn-1gb".to_string(),
                recipient: "2348012345678".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(receipt.order_id, "OID-991");
        assert_eq!(receipt.provider_reference.as_deref(), Some("PRV-77"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_place_order_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/orders")
            .with_status(422)
            .with_body(r#"{"error":"unknown service"}"#)
            .create_async()
            .await;

        let client = VendClient::new(server.url(), "pk_test".to_string());
        let err = client
            .place_order(&VendOrder {
                reference: "ORD-2".to_string(),
                provider_code: "bogus".to_string(),
                recipient: "2348012345678".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_circuit_opens_after_consecutive_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/orders")
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = VendClient::new(server.url(), "pk_test".to_string());
        let order = VendOrder {
            reference: "ORD-3".to_string(),
            provider_code: "mtn-1gb".to_string(),
            recipient: "2348012345678".to_string(),
        };

        for _ in 0..3 {
            let _ = client.place_order(&order).await;
        }

        assert_eq!(client.circuit_state(), "open");
        let err = client.place_order(&order).await.unwrap_err();
        assert!(matches!(err, ProviderError::CircuitBreakerOpen));
    }
}
