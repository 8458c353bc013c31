use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::PostgrestClient;
use crate::models::{NewVideo, RepositoryError, RepositoryResult, Video, VideoPatch};

/// Trait defining the interface for video data access operations
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a new video row and return it as stored
    async fn create(&self, video: NewVideo) -> RepositoryResult<Video>;

    /// Apply a patch to the video with `id`; `NotFound` if no row matched
    async fn update(&self, id: Uuid, patch: VideoPatch) -> RepositoryResult<Video>;

    /// Find a video by its ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Video>>;

    /// Apply a patch to the video created for a provider upload
    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: VideoPatch,
    ) -> RepositoryResult<Option<Video>>;
}

/// PostgREST implementation of the VideoRepository trait
pub struct PostgrestVideoRepository {
    client: Arc<PostgrestClient>,
    table_name: String,
}

impl PostgrestVideoRepository {
    pub fn new(client: Arc<PostgrestClient>, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl VideoRepository for PostgrestVideoRepository {
    #[instrument(skip(self, video), fields(table = %self.table_name, video_id = %video.id))]
    async fn create(&self, video: NewVideo) -> RepositoryResult<Video> {
        info!("Creating video row");

        self.client
            .insert_returning(&self.table_name, &video)
            .await
    }

    #[instrument(skip(self, patch), fields(table = %self.table_name))]
    async fn update(&self, id: Uuid, patch: VideoPatch) -> RepositoryResult<Video> {
        info!("Updating video row");

        let rows: Vec<Video> = self
            .client
            .update(&self.table_name, &[("id", id.to_string())], &patch)
            .await?;

        rows.into_iter().next().ok_or_else(|| {
            warn!("No video row matched update");
            RepositoryError::NotFound
        })
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Video>> {
        info!("Finding video by ID");

        self.client
            .select_one(&self.table_name, "*", &[("id", id.to_string())])
            .await
    }

    #[instrument(skip(self, patch), fields(table = %self.table_name))]
    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: VideoPatch,
    ) -> RepositoryResult<Option<Video>> {
        info!("Updating video row by upload ID");

        let rows: Vec<Video> = self
            .client
            .update(
                &self.table_name,
                &[("mux_upload_id", upload_id.to_string())],
                &patch,
            )
            .await?;

        Ok(rows.into_iter().next())
    }
}
