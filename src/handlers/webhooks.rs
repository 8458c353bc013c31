use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    response::Json,
};
use tracing::instrument;

use super::responses::{bytes_rejection_to_response, service_error_to_response};
use super::{ApiError, AppState};
use crate::models::{ApiResponse, WebhookReceipt};
use crate::services::webhook_service::SIGNATURE_HEADER;

/// Receive a signed delivery from the video provider.
///
/// The raw body is handed over untouched since the signature covers its exact bytes.
#[instrument(name = "mux_webhook", skip_all)]
pub async fn mux_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiResponse<WebhookReceipt>>, ApiError> {
    let body = body.map_err(bytes_rejection_to_response)?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let receipt = state
        .webhooks
        .handle(signature, &body, chrono::Utc::now().timestamp())
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(ApiResponse::ok(receipt)))
}
