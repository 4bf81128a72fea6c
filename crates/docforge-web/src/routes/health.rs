use axum::Json;

use super::HealthResponse;

/// Liveness probe. Does not check the office suite.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
