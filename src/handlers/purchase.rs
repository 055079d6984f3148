use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::PurchaseOutcome;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: Uuid,
    pub bundle_id: Uuid,
    pub recipient_phone: String,
}

pub async fn create_purchase(
    State(state): State<AppState>,
    Json(payload): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .purchases
        .purchase(payload.user_id, payload.bundle_id, &payload.recipient_phone)
        .await?;

    let response = match outcome {
        PurchaseOutcome::Placed {
            transaction,
            order_id,
        } => (
            StatusCode::OK,
            Json(json!({
                "reference": transaction.reference,
                "status": transaction.status,
                "order_id": order_id,
                "amount": transaction.amount,
            })),
        ),
        PurchaseOutcome::AcceptedPending { transaction } => (
            StatusCode::ACCEPTED,
            Json(json!({
                "reference": transaction.reference,
                "status": transaction.status,
                "amount": transaction.amount,
                "message": "order accepted, delivery pending",
            })),
        ),
    };

    Ok(response)
}
