use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{ProviderError, ProviderResult};
use crate::observability::{BusinessTracingMiddleware, Metrics};

/// Parameters for a browser direct upload
#[derive(Debug, Clone, PartialEq)]
pub struct DirectUploadRequest {
    /// Our video row id, echoed back by the provider as `passthrough`
    pub video_id: Uuid,
    pub cors_origin: String,
    pub playback_policy: String,
}

/// Upload slot issued by the provider
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DirectUpload {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Create a one-shot upload URL the browser PUTs the file to
    async fn create_direct_upload(&self, request: DirectUploadRequest)
        -> ProviderResult<DirectUpload>;

    /// Cancel an upload that has not completed yet
    async fn cancel_upload(&self, upload_id: &str) -> ProviderResult<()>;
}

#[derive(Debug, Serialize)]
struct NewAssetSettings<'a> {
    playback_policy: [&'a str; 1],
    passthrough: String,
}

#[derive(Debug, Serialize)]
struct CreateUploadBody<'a> {
    cors_origin: &'a str,
    new_asset_settings: NewAssetSettings<'a>,
}

#[derive(Debug, Deserialize)]
struct MuxEnvelope<T> {
    data: T,
}

/// Mux Video API client
pub struct MuxClient {
    http: Client,
    api_url: String,
    token_id: String,
    token_secret: String,
    tracer: BusinessTracingMiddleware,
}

impl MuxClient {
    pub fn new(
        http: Client,
        api_url: &str,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token_id: token_id.into(),
            token_secret: token_secret.into(),
            tracer: BusinessTracingMiddleware::new(metrics),
        }
    }

    fn uploads_url(&self) -> String {
        format!("{}/video/v1/uploads", self.api_url)
    }

    async fn check_status(response: Response) -> ProviderResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized,
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            _ => {
                let body = response.text().await.unwrap_or_default();
                ProviderError::Api {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                }
            }
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http {
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl VideoProvider for MuxClient {
    #[instrument(skip(self, request), fields(video_id = %request.video_id))]
    async fn create_direct_upload(
        &self,
        request: DirectUploadRequest,
    ) -> ProviderResult<DirectUpload> {
        let body = CreateUploadBody {
            cors_origin: &request.cors_origin,
            new_asset_settings: NewAssetSettings {
                playback_policy: [&request.playback_policy],
                passthrough: request.video_id.to_string(),
            },
        };

        let call = self
            .http
            .post(self.uploads_url())
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&body)
            .send();

        let upload = self
            .tracer
            .trace_provider_call("create_direct_upload", async {
                let response = call.await.map_err(map_transport_error)?;
                let response = Self::check_status(response).await?;
                let envelope = response
                    .json::<MuxEnvelope<DirectUpload>>()
                    .await
                    .map_err(|e| ProviderError::InvalidResponse {
                        message: e.to_string(),
                    })?;

                if envelope.data.url.is_empty() {
                    return Err(ProviderError::InvalidResponse {
                        message: "upload has no url".to_string(),
                    });
                }
                Ok(envelope.data)
            })
            .await?;

        info!(upload_id = %upload.id, "Direct upload created");
        Ok(upload)
    }

    #[instrument(skip(self))]
    async fn cancel_upload(&self, upload_id: &str) -> ProviderResult<()> {
        let call = self
            .http
            .put(format!("{}/{}/cancel", self.uploads_url(), upload_id))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send();

        self.tracer
            .trace_provider_call("cancel_upload", async {
                let response = call.await.map_err(map_transport_error)?;
                Self::check_status(response).await?;
                Ok(())
            })
            .await
    }
}
