pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod provider;
pub mod services;
pub mod signature;
pub mod startup;
pub mod validation;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::gateway::{GatewayClient, PaymentGateway};
use crate::middleware::{ProviderWebhookGate, provider_ip_allowlist};
use crate::provider::{FulfillmentProvider, VendClient};
use crate::services::{PurchaseService, Reconciler, WalletService};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub gateway_secret: String,
    pub wallet: WalletService,
    pub purchases: PurchaseService,
    pub reconciler: Reconciler,
    pub provider_gate: ProviderWebhookGate,
}

impl AppState {
    pub fn from_config(db: sqlx::PgPool, config: &Config) -> Self {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(GatewayClient::new(
            config.gateway_base_url.clone(),
            config.gateway_secret.clone(),
        ));
        let provider: Arc<dyn FulfillmentProvider> = Arc::new(VendClient::new(
            config.provider_base_url.clone(),
            config.provider_api_key.clone(),
        ));

        Self::with_collaborators(
            db,
            config.gateway_secret.clone(),
            ProviderWebhookGate {
                allowed_ips: config.provider_allowed_ips.clone(),
                trusted_proxy_depth: config.trusted_proxy_depth,
            },
            gateway,
            provider,
        )
    }

    /// Wire the state with explicit collaborators. Tests inject fakes for
    /// the gateway and provider here.
    pub fn with_collaborators(
        db: sqlx::PgPool,
        gateway_secret: String,
        provider_gate: ProviderWebhookGate,
        gateway: Arc<dyn PaymentGateway>,
        provider: Arc<dyn FulfillmentProvider>,
    ) -> Self {
        Self {
            wallet: WalletService::new(db.clone()),
            purchases: PurchaseService::new(db.clone(), provider),
            reconciler: Reconciler::new(db.clone(), gateway),
            gateway_secret,
            provider_gate,
            db,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let provider_webhook = Router::new()
        .route("/webhooks/provider", post(handlers::webhook::provider_webhook))
        .layer(from_fn_with_state(
            state.provider_gate.clone(),
            provider_ip_allowlist,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/wallet/deposits", post(handlers::wallet::initialize_deposit))
        .route(
            "/wallet/deposits/:reference/verify",
            get(handlers::wallet::verify_deposit),
        )
        .route("/purchases", post(handlers::purchase::create_purchase))
        .route("/webhooks/gateway", post(handlers::webhook::gateway_webhook))
        .route(
            "/transactions/:reference",
            get(handlers::transactions::get_transaction),
        )
        .merge(provider_webhook)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
