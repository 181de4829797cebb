//! Payment intake API module
//!
//! Webhook endpoints for both providers plus the synchronous wallet
//! capture-confirmation path.

mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/payments", payment_routes())
}

fn payment_routes() -> Router<ServerState> {
    Router::new()
        .route("/webhooks/card", post(handler::card_webhook))
        .route("/webhooks/wallet", post(handler::wallet_webhook))
        .route("/wallet/orders", post(handler::create_wallet_order))
        .route(
            "/wallet/{provider_order_id}/capture",
            post(handler::capture_confirmation),
        )
}
