//! Checkout API handler

use axum::Json;
use axum::extract::State;

use crate::checkout::{CheckoutReceipt, CheckoutRequest, create_order};
use crate::core::ServerState;
use crate::utils::error::{AppResult, ok};
use shared::ApiResponse;

/// POST /api/checkout
pub async fn create(
    State(state): State<ServerState>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutReceipt>>> {
    let receipt = create_order(&state.store, &request)?;
    Ok(ok(receipt))
}
