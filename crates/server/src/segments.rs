use axum::{extract::State, http::StatusCode, Json};
use fitlens_core::errors::ApplicationError;
use fitlens_core::segmentation::SegmentSummary;
use fitlens_db::{SegmentationJob, SegmentationOutcome};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{reject, ApiRejection};
use crate::state::AppState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub clusters: Vec<SegmentSummary>,
}

fn outcome_status(outcome: &SegmentationOutcome) -> StatusCode {
    match outcome.error_class.as_deref() {
        None => StatusCode::OK,
        Some("data") => StatusCode::UNPROCESSABLE_ENTITY,
        Some("persistence") => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn run(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SegmentationOutcome>), ApiRejection> {
    let Ok(_guard) = state.segmentation_lock.try_lock() else {
        let correlation_id = Uuid::new_v4().to_string();
        return Err(reject(
            ApplicationError::Conflict("a segmentation run is already in progress".to_string()),
            &correlation_id,
        ));
    };

    let outcome = SegmentationJob::new(
        state.orders.as_ref(),
        state.segments.as_ref(),
        &state.config.segmentation,
    )
    .run()
    .await;

    Ok((outcome_status(&outcome), Json(outcome)))
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, ApiRejection> {
    let correlation_id = Uuid::new_v4().to_string();
    let clusters =
        state.segments.summary().await.map_err(|error| reject(error, &correlation_id))?;

    Ok(Json(SummaryResponse { success: true, clusters }))
}
