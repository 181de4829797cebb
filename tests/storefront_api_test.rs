//! Catalog and checkout HTTP tests

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{seed_product, setup_state};
use shop_server::routes;
use shop_server::ServerState;

async fn send(state: &ServerState, request: Request<Body>) -> (StatusCode, Value) {
    let response = routes::build_app(state)
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn catalog_lists_only_active_products() {
    let (state, _dir) = setup_state().await;
    seed_product(&state, "In stock", 1000, 5).await;
    seed_product(&state, "Sold out", 2000, 0).await;

    let (status, body) = send(&state, get("/api/products")).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert_eq!(names, vec!["In stock"]);
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let (state, _dir) = setup_state().await;
    let (status, _) = send(&state, get("/api/products/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn checkout_creates_pending_order_with_catalog_prices() {
    let (state, _dir) = setup_state().await;
    let mug = seed_product(&state, "Mug", 1500, 5).await;
    let poster = seed_product(&state, "Poster", 875, 5).await;

    let (status, body) = send(
        &state,
        post_json(
            "/api/checkout",
            json!({
                "customer_email": "buyer@example.com",
                "items": [
                    { "product_id": mug, "quantity": 2 },
                    { "product_id": poster, "quantity": 1 },
                ],
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("pending"));
    assert_eq!(body["amount_total"], json!(2 * 1500 + 875));
    assert_eq!(body["currency"], json!("EUR"));
    assert!(body["external_txn_id"].is_null());
}

#[tokio::test]
async fn checkout_rejects_empty_cart() {
    let (state, _dir) = setup_state().await;
    let (status, _) = send(
        &state,
        post_json("/api/checkout", json!({ "items": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_rejects_inactive_product() {
    let (state, _dir) = setup_state().await;
    let sold_out = seed_product(&state, "Sold out", 2000, 0).await;

    let (status, _) = send(
        &state,
        post_json(
            "/api/checkout",
            json!({ "items": [{ "product_id": sold_out, "quantity": 1 }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn shipping_endpoint_adds_configured_fee() {
    let (state, _dir) = setup_state().await;
    let mug = seed_product(&state, "Mug", 4255, 5).await;

    let (_, order) = send(
        &state,
        post_json(
            "/api/checkout",
            json!({ "items": [{ "product_id": mug, "quantity": 1 }] }),
        ),
    )
    .await;
    let order_id = order["id"].as_str().expect("order id").to_string();

    let (status, body) = send(
        &state,
        post_json(&format!("/api/checkout/{order_id}/shipping"), json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_total"], json!(4255 + 495));
}

#[tokio::test]
async fn order_detail_includes_line_items() {
    let (state, _dir) = setup_state().await;
    let mug = seed_product(&state, "Mug", 1500, 5).await;

    let (_, order) = send(
        &state,
        post_json(
            "/api/checkout",
            json!({ "items": [{ "product_id": mug, "quantity": 2 }] }),
        ),
    )
    .await;
    let order_id = order["id"].as_str().expect("order id");

    let (status, body) = send(&state, get(&format!("/api/orders/{order_id}"))).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], json!("Mug"));
    assert_eq!(items[0]["quantity"], json!(2));
    assert_eq!(items[0]["unit_price"], json!(1500));
}

#[tokio::test]
async fn health_reports_ok() {
    let (state, _dir) = setup_state().await;
    let (status, body) = send(&state, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
