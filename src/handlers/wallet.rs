use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub user_id: Uuid,
    pub amount: BigDecimal,
}

pub async fn initialize_deposit(
    State(state): State<AppState>,
    Json(payload): Json<DepositRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state
        .wallet
        .initialize_deposit(payload.user_id, payload.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(tx)))
}

/// Verify channel: answers with the current status, consulting the
/// gateway first if the deposit is still pending.
pub async fn verify_deposit(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.reconciler.verify_deposit(&reference).await?;
    Ok(Json(tx))
}
