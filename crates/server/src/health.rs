use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use fitlens_db::{ping, DbPool};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
    pub product_count: usize,
    pub database: &'static str,
    pub checked_at: String,
}

/// 200 while the database answers; `status` is `degraded` until the catalog is built.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ready = database_ready(&state.db_pool).await;
    let catalog = state.recommendations.health();

    let payload = HealthResponse {
        status: if database_ready && catalog.ready { "ok" } else { "degraded" },
        model_loaded: catalog.ready,
        product_count: catalog.product_count,
        database: if database_ready { "ready" } else { "degraded" },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if database_ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_ready(pool: &DbPool) -> bool {
    match ping(pool).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                event_name = "system.health.database_degraded",
                correlation_id = "health",
                error = %error,
                "database health query failed"
            );
            false
        }
    }
}
