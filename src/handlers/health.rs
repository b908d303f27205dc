use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::json;

use crate::handlers::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Process is up")),
    tag = "health"
)]
pub async fn liveness() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Database and cache reachable"),
        (status = 503, description = "A dependency is down")
    ),
    tag = "health"
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let db_status = match state.database.ping().await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let redis_status = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(()) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "disabled",
    };

    let ready = db_status == "healthy" && redis_status != "unhealthy";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "database": db_status,
                "redis": redis_status
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}
