use std::sync::Arc;

use axum::{extract::State, Json};
use fitlens_core::errors::{ApplicationError, DomainError};
use fitlens_core::recommend::{Recommendation, RefreshReport};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{reject, ApiRejection};
use crate::state::AppState;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RecommendRequest {
    pub sku: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendedProduct {
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub score: f64,
}

impl From<Recommendation> for RecommendedProduct {
    fn from(value: Recommendation) -> Self {
        Self { sku: value.sku, name: value.name, brand: value.brand, score: value.score }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendResponse {
    pub success: bool,
    pub source_sku: String,
    pub recommendations: Vec<RecommendedProduct>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub product_count: usize,
    pub report: RefreshReport,
}

/// Reads the catalog and swaps in a freshly built index. The previous index
/// keeps serving if anything fails.
pub async fn reload_catalog(
    state: &AppState,
    correlation_id: &str,
) -> Result<RefreshReport, ApplicationError> {
    let rows = state.catalog.list_raw().await?;
    let service = Arc::clone(&state.recommendations);

    let report = tokio::task::spawn_blocking(move || service.refresh(&rows))
        .await
        .map_err(|error| {
            DomainError::InvariantViolation(format!("catalog build task failed: {error}"))
        })??;

    info!(
        event_name = "catalog.refresh.completed",
        correlation_id = %correlation_id,
        product_count = report.product_count,
        input_rows = report.cleaning.input_rows,
        dropped_incomplete = report.cleaning.dropped_incomplete,
        dropped_unparsable_price = report.cleaning.dropped_unparsable_price,
        dropped_duplicate_sku = report.cleaning.dropped_duplicate_sku,
        "similarity matrix rebuilt"
    );
    Ok(report)
}

pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiRejection> {
    let correlation_id = Uuid::new_v4().to_string();

    let sku = match request.sku.as_deref().map(str::trim) {
        Some(sku) if !sku.is_empty() => sku.to_string(),
        _ => {
            return Err(reject(DomainError::Data("sku is required".to_string()), &correlation_id))
        }
    };
    let limit = request
        .limit
        .unwrap_or(state.config.recommendation.default_limit)
        .min(state.config.recommendation.max_limit);

    let recommendations = state
        .recommendations
        .recommend(&sku, limit)
        .map_err(|error| reject(error, &correlation_id))?;

    info!(
        event_name = "catalog.recommend.served",
        correlation_id = %correlation_id,
        sku = %sku,
        limit,
        returned = recommendations.len(),
        "recommendations served"
    );

    Ok(Json(RecommendResponse {
        success: true,
        source_sku: sku,
        recommendations: recommendations.into_iter().map(RecommendedProduct::from).collect(),
    }))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiRejection> {
    let correlation_id = Uuid::new_v4().to_string();

    match reload_catalog(&state, &correlation_id).await {
        Ok(report) => Ok(Json(RefreshResponse {
            success: true,
            product_count: report.product_count,
            report,
        })),
        Err(error) => {
            warn!(
                event_name = "catalog.refresh.failed",
                correlation_id = %correlation_id,
                error = %error,
                "catalog refresh failed; previous index kept"
            );
            Err(reject(error, &correlation_id))
        }
    }
}
