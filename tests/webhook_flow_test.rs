mod common;

use std::str::FromStr;

use axum::body::Body;
use axum::http::Request;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::types::BigDecimal;
use tower::ServiceExt;
use uuid::Uuid;

use airvend_core::db::queries;
use airvend_core::domain::transaction::TxStatus;
use airvend_core::services::WalletService;
use airvend_core::signature::compute_signature;

use common::{ScriptedGateway, ScriptedProvider, TEST_GATEWAY_SECRET};

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn gateway_body(reference: &str, amount: &str) -> String {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount,
            "metadata": {}
        }
    })
    .to_string()
}

#[tokio::test]
async fn test_gateway_webhook_rejects_bad_signature() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let app = airvend_core::create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/gateway")
                .header("X-Signature", "deadbeef")
                .header("content-type", "application/json")
                .body(Body::from(gateway_body("DEP-1", "50.00")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_gateway_webhook_rejects_missing_signature() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let app = airvend_core::create_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/gateway")
                .header("content-type", "application/json")
                .body(Body::from(gateway_body("DEP-1", "50.00")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signed_gateway_webhook_credits_wallet_once() {
    let (pool, _container) = common::setup_pool().await;
    let user_id = common::seed_account(&pool, "0.00").await;
    let wallet = WalletService::new(pool.clone());
    let deposit = wallet.initialize_deposit(user_id, dec("50.00")).await.unwrap();

    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let body = gateway_body(&deposit.reference, "50.00");
    let sig = compute_signature(TEST_GATEWAY_SECRET, body.as_bytes());

    // Deliver the same signed event twice.
    for _ in 0..2 {
        let res = client
            .post(format!("{}/webhooks/gateway", base_url))
            .header("X-Signature", &sig)
            .header("content-type", "application/json")
            .body(body.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    assert_eq!(common::account_balance(&pool, user_id).await, dec("50.00"));

    let settled = queries::get_transaction_by_reference(&pool, &deposit.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settled.status, TxStatus::Success);
}

#[tokio::test]
async fn test_gateway_webhook_unknown_reference_returns_200() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let body = gateway_body("DEP-does-not-exist", "50.00");
    let sig = compute_signature(TEST_GATEWAY_SECRET, body.as_bytes());

    let res = client
        .post(format!("{}/webhooks/gateway", base_url))
        .header("X-Signature", &sig)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();

    // Dropped, not errored: anything else would cause redelivery storms.
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_provider_webhook_always_returns_200() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    // Unknown order.
    let res = client
        .post(format!("{}/webhooks/provider", base_url))
        .json(&json!({
            "event": "order.status.updated",
            "orderId": "OID-unknown",
            "reference": "ORD-unknown",
            "status": "delivered",
            "recipient": "2348012345678"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Unparseable payload.
    let res = client
        .post(format!("{}/webhooks/provider", base_url))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_purchase_endpoint_returns_202_when_provider_down() {
    let (pool, _container) = common::setup_pool().await;
    let user_id = common::seed_account(&pool, "100.00").await;
    let bundle_id = common::seed_bundle(&pool, "60.00").await;

    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/purchases", base_url))
        .json(&json!({
            "user_id": user_id,
            "bundle_id": bundle_id,
            "recipient_phone": "2348012345678"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["reference"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(body["status"], "processing");

    assert_eq!(common::account_balance(&pool, user_id).await, dec("40.00"));
}

#[tokio::test]
async fn test_purchase_endpoint_rejects_insufficient_funds() {
    let (pool, _container) = common::setup_pool().await;
    let user_id = common::seed_account(&pool, "10.00").await;
    let bundle_id = common::seed_bundle(&pool, "60.00").await;

    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/purchases", base_url))
        .json(&json!({
            "user_id": user_id,
            "bundle_id": bundle_id,
            "recipient_phone": "2348012345678"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::account_balance(&pool, user_id).await, dec("10.00"));
}

#[tokio::test]
async fn test_purchase_endpoint_unknown_bundle_is_404() {
    let (pool, _container) = common::setup_pool().await;
    let user_id = common::seed_account(&pool, "100.00").await;

    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/purchases", base_url))
        .json(&json!({
            "user_id": user_id,
            "bundle_id": Uuid::new_v4(),
            "recipient_phone": "2348012345678"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deposit_initialization_and_lookup() {
    let (pool, _container) = common::setup_pool().await;
    let user_id = common::seed_account(&pool, "0.00").await;

    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/wallet/deposits", base_url))
        .json(&json!({"user_id": user_id, "amount": "50.00"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let reference = created["reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("DEP-"));
    assert_eq!(created["status"], "initialized");

    let res = client
        .get(format!("{}/transactions/{}", base_url, reference))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: serde_json::Value = res.json().await.unwrap();
    assert_eq!(fetched["reference"], reference.as_str());

    // Deposits do not move the balance until settlement.
    assert_eq!(common::account_balance(&pool, user_id).await, dec("0.00"));
}

#[tokio::test]
async fn test_verify_endpoint_unknown_reference_is_404() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/wallet/deposits/DEP-nope/verify", base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (pool, _container) = common::setup_pool().await;
    let state = common::build_state(
        pool.clone(),
        ScriptedGateway::empty(),
        ScriptedProvider::always_failing(),
    );
    let base_url = common::spawn_app(state).await;

    let res = reqwest::get(format!("{}/health", base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["db"], "connected");
}
