use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;
use crate::services::reconciler::{GatewayEvent, ProviderEvent};
use crate::signature;

/// Payment-gateway webhook. Signature verification gates everything;
/// past that gate, business mismatches (unknown reference, already
/// settled) are dropped with a 200 so the gateway stops redelivering.
pub async fn gateway_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let header_signature = headers
        .get("X-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::SignatureMismatch)?;

    signature::verify_signature(&state.gateway_secret, &body, header_signature)?;

    let event: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {}", e)))?;

    state.reconciler.handle_gateway_event(event).await?;

    Ok(StatusCode::OK)
}

/// Fulfillment-provider webhook. Sits behind the IP allowlist; always
/// answers 200, even for payloads it cannot use, since the provider's
/// retry policy treats anything else as a delivery failure.
pub async fn provider_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let event: ProviderEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable provider webhook, dropped");
            return Ok(StatusCode::OK);
        }
    };

    if event.event != "order.status.updated" {
        tracing::info!(event = %event.event, "ignoring provider event type");
        return Ok(StatusCode::OK);
    }

    state.reconciler.handle_provider_event(event).await?;

    Ok(StatusCode::OK)
}
