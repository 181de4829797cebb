//! Product Repository

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::db::models::{Product, ProductCreate};

#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find all active products, catalog order
    pub async fn find_all_active(&self) -> RepoResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE is_active = 1 ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Find product by id (active or not)
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, data: ProductCreate, currency: &str) -> RepoResult<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let is_active = data.stock > 0;

        sqlx::query(
            "INSERT INTO products \
             (id, name, description, price, currency, stock, is_active, image, sort_order, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&data.name)
        .bind(&data.description)
        .bind(data.price)
        .bind(currency)
        .bind(data.stock)
        .bind(is_active)
        .bind(&data.image)
        .bind(data.sort_order)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }
}
