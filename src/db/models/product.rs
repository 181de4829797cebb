//! Product Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Catalog product
///
/// `price` is in integer minor-currency units (EUR cents). `stock` never
/// goes negative; when it reaches zero `is_active` is forced false so the
/// catalog stops exposing the product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub stock: i64,
    pub is_active: bool,
    pub image: Option<String>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Create product payload (admin seeding)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub stock: i64,
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: i64,
}
