use axum::Json;

/// GET /health — liveness probe. Touches neither Discord nor the
/// subscription service.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
