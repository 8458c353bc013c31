use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use tracing::instrument;

use super::responses::{json_rejection_to_response, service_error_to_response};
use super::{ApiError, AppState};
use crate::models::{ApiResponse, WaitlistRequest, WaitlistResponse};

/// Join the waitlist; signing up twice reports success
#[instrument(name = "join_waitlist", skip(state, body))]
pub async fn join_waitlist(
    State(state): State<AppState>,
    body: Result<Json<WaitlistRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<WaitlistResponse>>, ApiError> {
    let Json(request) = body.map_err(json_rejection_to_response)?;

    let outcome = state
        .waitlist
        .join(request)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ApiResponse::ok(WaitlistResponse::from(outcome))))
}
