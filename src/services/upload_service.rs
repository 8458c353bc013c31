use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::models::{
    parse_channel_id, CreateUploadRequest, NewVideo, ServiceError, ServiceResult, UploadResponse,
    Validate, VideoPatch, VideoStatus,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::{ChannelRepository, VideoRepository};
use crate::services::video_provider::{DirectUploadRequest, VideoProvider};

/// Provider settings applied to every upload
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub cors_origin: String,
    pub playback_policy: String,
}

/// Issues direct-upload URLs for videos on channels the caller owns
pub struct UploadService {
    channels: Arc<dyn ChannelRepository>,
    videos: Arc<dyn VideoRepository>,
    provider: Arc<dyn VideoProvider>,
    settings: UploadSettings,
    tracer: BusinessTracingMiddleware,
}

impl UploadService {
    pub fn new(
        channels: Arc<dyn ChannelRepository>,
        videos: Arc<dyn VideoRepository>,
        provider: Arc<dyn VideoProvider>,
        settings: UploadSettings,
        tracer: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            channels,
            videos,
            provider,
            settings,
            tracer,
        }
    }

    /// Validate, check channel ownership, create the row, then ask the provider for an upload URL
    #[instrument(skip(self, request), fields(user_id = %user_id, channel_id = %request.channel_id))]
    pub async fn create_upload(
        &self,
        user_id: Uuid,
        request: CreateUploadRequest,
    ) -> ServiceResult<UploadResponse> {
        crate::info_with_trace!("Creating video upload");

        let channel_label = request.channel_id.clone();
        self.tracer
            .trace_upload(&channel_label, self.create_upload_inner(user_id, request))
            .await
    }

    async fn create_upload_inner(
        &self,
        user_id: Uuid,
        request: CreateUploadRequest,
    ) -> ServiceResult<UploadResponse> {
        request.validate()?;
        let channel_id = parse_channel_id(&request.channel_id)?;

        let channel = self
            .channels
            .find_by_id(channel_id)
            .await?
            .ok_or_else(|| ServiceError::ChannelNotFound {
                id: channel_id.to_string(),
            })?;

        if !channel.is_owned_by(user_id) {
            crate::warn_with_trace!(
                channel_id = %channel_id,
                owner_id = %channel.owner_id,
                "Upload attempted on a channel the user does not own"
            );
            return Err(ServiceError::Forbidden {
                message: "You do not own this channel".to_string(),
            });
        }

        let new_video = NewVideo::uploading(
            channel_id,
            user_id,
            &request.title,
            request.description.as_deref(),
        );
        let video = self.videos.create(new_video).await?;

        let upload = match self
            .provider
            .create_direct_upload(DirectUploadRequest {
                video_id: video.id,
                cors_origin: self.settings.cors_origin.clone(),
                playback_policy: self.settings.playback_policy.clone(),
            })
            .await
        {
            Ok(upload) => upload,
            Err(e) => {
                self.mark_errored(video.id).await;
                return Err(e.into());
            }
        };

        if let Err(e) = self
            .videos
            .update(video.id, VideoPatch::upload_id(upload.id.clone()))
            .await
        {
            if let Err(cancel_error) = self.provider.cancel_upload(&upload.id).await {
                warn!(
                    upload_id = %upload.id,
                    error = %cancel_error,
                    "Failed to cancel orphaned upload"
                );
            }
            self.mark_errored(video.id).await;
            return Err(e.into());
        }

        crate::info_with_trace!(video_id = %video.id, upload_id = %upload.id, "Video upload created");

        Ok(UploadResponse {
            video_id: video.id,
            upload_url: upload.url,
            upload_id: upload.id,
        })
    }

    /// Best effort; the original failure is what the caller sees
    async fn mark_errored(&self, video_id: Uuid) {
        if let Err(e) = self
            .videos
            .update(video_id, VideoPatch::status(VideoStatus::Errored))
            .await
        {
            warn!(video_id = %video_id, error = %e, "Failed to mark video as errored");
        }
    }
}
