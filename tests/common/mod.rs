//! Shared test harness: temp database, config and server state

use sqlx::SqlitePool;
use tempfile::TempDir;

use shop_server::core::{Config, PaymentConfig};
use shop_server::db::models::{OrderCreate, OrderItemCreate, ProductCreate};
use shop_server::db::DbService;
use shop_server::ServerState;

/// Test configuration; the wallet API base points at a closed local port
/// so every outbound provider call fails fast (and must fail closed).
pub fn test_config(work_dir: &std::path::Path) -> Config {
    Config {
        work_dir: work_dir.to_string_lossy().into_owned(),
        http_port: 0,
        environment: "test".into(),
        currency: "EUR".into(),
        shipping_fee: 495,
        provider_timeout_ms: 500,
        payment: PaymentConfig {
            card_signing_secret: "whsec_test123secret456".into(),
            wallet_webhook_id: "WH-TEST".into(),
            wallet_api_base: "http://127.0.0.1:9".into(),
            wallet_client_id: "client-test".into(),
            wallet_client_secret: "secret-test".into(),
        },
    }
}

/// Fresh state over a file-backed SQLite database in a temp directory.
/// The `TempDir` must stay alive for the duration of the test.
pub async fn setup_state() -> (ServerState, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let config = test_config(dir.path());
    let db_path = dir.path().join("shop.db");
    let db = DbService::new(&db_path.to_string_lossy())
        .await
        .expect("test database");
    let state = ServerState::build(config, db.pool).expect("server state");
    (state, dir)
}

pub async fn seed_product(state: &ServerState, name: &str, price: i64, stock: i64) -> String {
    let product = state
        .products()
        .create(
            ProductCreate {
                name: name.into(),
                description: None,
                price,
                stock,
                image: None,
                sort_order: 0,
            },
            "EUR",
        )
        .await
        .expect("seed product");
    product.id
}

pub async fn seed_order(state: &ServerState, items: &[(&str, i64)]) -> String {
    let order = state
        .orders()
        .create(
            OrderCreate {
                customer_email: Some("customer@example.com".into()),
                shipping: None,
                items: items
                    .iter()
                    .map(|(product_id, quantity)| OrderItemCreate {
                        product_id: (*product_id).into(),
                        quantity: *quantity,
                    })
                    .collect(),
            },
            "EUR",
        )
        .await
        .expect("seed order");
    order.id
}

pub async fn product_stock_and_active(pool: &SqlitePool, id: &str) -> (i64, bool) {
    sqlx::query_as::<_, (i64, bool)>("SELECT stock, is_active FROM products WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("product row")
}
