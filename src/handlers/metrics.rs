use axum::{extract::State, http::header, response::IntoResponse};
use std::sync::Arc;
use tracing::error;

use super::responses::{error_response, ApiError, INTERNAL_ERROR_MESSAGE};
use crate::models::ErrorCode;
use crate::observability::Metrics;

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus scrape target. Encoding failures use the regular error envelope.
pub async fn metrics_handler(
    State(metrics): State<Arc<Metrics>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        error_response(ErrorCode::InternalError, INTERNAL_ERROR_MESSAGE)
    })?;

    Ok(([(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_scrape_includes_domain_counters() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.record_webhook_event("video.asset.ready", true);
        metrics.record_auth_check("authenticated");
        metrics.record_video_upload(false);

        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROMETHEUS_TEXT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("webhook_events_total"));
        assert!(text.contains("video.asset.ready"));
        assert!(text.contains("auth_checks_total"));
        assert!(text.contains("video_uploads_total"));
    }
}
