//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub remote_development_enabled: bool,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        remote_development_enabled: state.config.remote_development_enabled,
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use crate::api::http::testing::{router, send};
    use crate::infra::sqlite::testing::create_test_pool;
    use crate::service::create::testing::VALID_DEVFILE;

    #[tokio::test]
    async fn test_health_check() {
        let pool = create_test_pool().await;
        let request = Request::get("/api/v1/health")
            .body(Body::empty())
            .expect("Failed to build request");

        let (status, body) = send(router(&pool, VALID_DEVFILE), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["remote_development_enabled"], true);
    }
}
