use axum::{
    extract::rejection::{BytesRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    BoxError,
};
use std::any::Any;
use tracing::{error, warn};

use crate::models::{
    ApiErrorBody, AuthError, ErrorCode, ProviderError, RepositoryError, ServiceError, WebhookError,
};

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ApiErrorBody>);

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Build an error envelope with the status paired to `code`
pub fn error_response(code: ErrorCode, message: impl Into<String>) -> ApiError {
    (code.status(), Json(ApiErrorBody::new(message, code)))
}

fn internal_error(err: &ServiceError) -> ApiError {
    crate::error_with_trace!(error = %err, "Request failed with unexpected error");
    error_response(ErrorCode::InternalError, INTERNAL_ERROR_MESSAGE)
}

/// Convert a service error into the response envelope.
///
/// Caller-facing codes carry a short message; everything else is logged and
/// reported as a generic internal error.
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    match &err {
        ServiceError::Forbidden { .. } => error_response(
            ErrorCode::Forbidden,
            "You do not have access to this channel",
        ),
        ServiceError::ChannelNotFound { .. } => {
            error_response(ErrorCode::NotFound, "Channel not found")
        }
        ServiceError::ValidationError { message } => {
            error_response(ErrorCode::ValidationError, message.clone())
        }
        ServiceError::Repository { source } => match source {
            RepositoryError::RateLimitExceeded => {
                warn!(error = %err, "Backing store rate limited the request");
                error_response(ErrorCode::RateLimited, "Too many requests, try again later")
            }
            _ => internal_error(&err),
        },
        ServiceError::Provider { source } => match source {
            ProviderError::RateLimited => {
                warn!(error = %err, "Video provider rate limited the request");
                error_response(ErrorCode::RateLimited, "Too many requests, try again later")
            }
            _ => internal_error(&err),
        },
        ServiceError::Auth { source } => {
            if source.is_rejection() {
                error_response(ErrorCode::Unauthorized, "Unauthorized")
            } else {
                internal_error(&err)
            }
        }
        ServiceError::Webhook { source } => match source {
            WebhookError::MissingSignature
            | WebhookError::MalformedSignature { .. }
            | WebhookError::StaleTimestamp { .. }
            | WebhookError::SignatureMismatch => {
                error_response(ErrorCode::Unauthorized, "Invalid webhook signature")
            }
            WebhookError::InvalidPayload { .. } => {
                error_response(ErrorCode::BadRequest, "Invalid webhook payload")
            }
            WebhookError::InvalidSecret => internal_error(&err),
        },
    }
}

/// Map an auth failure from the extractor or the session middleware
pub fn auth_error_to_response(err: AuthError) -> ApiError {
    service_error_to_response(err.into())
}

/// Malformed or mistyped JSON bodies are a caller error
pub fn json_rejection_to_response(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected request body");
    error_response(ErrorCode::BadRequest, "Invalid JSON body")
}

/// Unreadable raw bodies, including ones past the size limit
pub fn bytes_rejection_to_response(rejection: BytesRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected raw request body");
    error_response(ErrorCode::BadRequest, "Invalid request body")
}

/// Error handler for the request timeout layer
pub async fn handle_timeout(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!("Request exceeded the configured timeout");
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ApiErrorBody::uncoded("Request timed out")),
        )
    } else {
        error!(error = %err, "Middleware failed");
        error_response(ErrorCode::InternalError, INTERNAL_ERROR_MESSAGE)
    }
}

/// Fallback for routes that do not exist
pub async fn not_found() -> ApiError {
    error_response(ErrorCode::NotFound, "Not found")
}

/// Response for a handler that panicked
pub fn handle_panic(details: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = details.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = details.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Request handler panicked");

    error_response(ErrorCode::InternalError, INTERNAL_ERROR_MESSAGE).into_response()
}
