use axum::{http::StatusCode, Json};
use fitlens_core::errors::{ApplicationError, InterfaceError};
use serde::Serialize;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

pub type ApiRejection = (StatusCode, Json<ApiError>);

pub fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an application failure to the HTTP response for `correlation_id`.
pub fn reject(error: impl Into<ApplicationError>, correlation_id: &str) -> ApiRejection {
    let error = error.into();
    let error_class = error.error_class();
    let interface = error.into_interface(correlation_id);
    let status = status_for(&interface);

    warn!(
        event_name = "system.api.request_failed",
        correlation_id = %correlation_id,
        error_class,
        status = status.as_u16(),
        detail = %interface.message(),
        "request failed"
    );

    (
        status,
        Json(ApiError {
            success: false,
            error: interface.user_message().to_string(),
            detail: interface.message().to_string(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}
