//! Product API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use crate::common::{AppError, AppResult};
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate};

/// List active catalog products
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = state.products().find_all_active().await?;
    Ok(Json(products))
}

/// Get product by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    let product = state
        .products()
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {id} not found")))?;
    Ok(Json(product))
}

/// Create a product (admin seeding)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let product = state
        .products()
        .create(payload, &state.config.currency)
        .await?;
    Ok(Json(product))
}
