//! Checkout API module

mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/checkout", checkout_routes())
}

fn checkout_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create_order))
        .route("/{id}/shipping", post(handler::append_shipping))
}
