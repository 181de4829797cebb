//! Checkout handlers
//!
//! Creates pending orders from catalog selections and appends the
//! shipping line. Payment happens later, through the payments intake.

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::common::{AppError, AppResult};
use crate::core::ServerState;
use crate::db::models::{Order, OrderCreate};

/// Initiate a checkout session: create the pending order
pub async fn create_order(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<Order>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let order = state
        .orders()
        .create(payload, &state.config.currency)
        .await?;

    tracing::info!(order_id = %order.id, amount = order.amount_total, "Checkout session created");
    Ok(Json(order))
}

/// Append the shipping line item (once per order)
pub async fn append_shipping(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders()
        .append_shipping(&id, state.config.shipping_fee)
        .await?;
    Ok(Json(order))
}
