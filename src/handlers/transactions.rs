use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::AppState;
use crate::error::AppError;

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let tx = state.wallet.get_by_reference(&reference).await?;
    Ok(Json(tx))
}
