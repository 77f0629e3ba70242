use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET /health — server liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/v1/health — liveness probe behind the API prefix
pub async fn api_health() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "online",
        "message": "API is healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
