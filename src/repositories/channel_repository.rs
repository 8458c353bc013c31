use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::PostgrestClient;
use crate::models::{Channel, RepositoryResult};

/// Read access to channels
#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find a channel by its ID
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>>;
}

/// PostgREST implementation of the ChannelRepository trait
pub struct PostgrestChannelRepository {
    client: Arc<PostgrestClient>,
    table_name: String,
}

impl PostgrestChannelRepository {
    pub fn new(client: Arc<PostgrestClient>, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl ChannelRepository for PostgrestChannelRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>> {
        info!("Finding channel by ID");

        self.client
            .select_one(&self.table_name, "id,owner_id", &[("id", id.to_string())])
            .await
    }
}
