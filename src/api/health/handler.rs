//! Health check handler

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::common::AppResult;
use crate::core::ServerState;

pub async fn health(State(state): State<ServerState>) -> AppResult<Json<Value>> {
    // Touching the pool keeps this an actual liveness signal
    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    Ok(Json(json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "environment": state.config.environment,
    })))
}
