use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use tracing::instrument;

use super::responses::{json_rejection_to_response, service_error_to_response};
use super::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ApiResponse, CreateUploadRequest, UploadResponse};

/// Create a video row and a direct-upload URL for it
#[instrument(name = "upload_video", skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<CreateUploadRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UploadResponse>>, ApiError> {
    let Json(request) = body.map_err(json_rejection_to_response)?;

    let upload = state
        .uploads
        .create_upload(user.0.id, request)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ApiResponse::ok(upload)))
}
