use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{health, ml, segments};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/ml/recommend", post(ml::recommend))
        .route("/api/ml/refresh", post(ml::refresh))
        .route("/api/segments/run", post(segments::run))
        .route("/api/segments/summary", get(segments::summary))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use fitlens_core::config::AppConfig;
    use tower::ServiceExt;

    use super::router;
    use crate::ml::reload_catalog;
    use crate::state::test_support::{seed_products, state_with};

    #[tokio::test]
    async fn recommend_route_accepts_json_body() {
        let state = state_with(AppConfig::default()).await;
        seed_products(&state).await;
        reload_catalog(&state, "test").await.expect("reload");

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/ml/recommend")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"sku": "A", "limit": 1}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let state = state_with(AppConfig::default()).await;

        let response = router(state)
            .oneshot(Request::builder().uri("/api/unknown").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
