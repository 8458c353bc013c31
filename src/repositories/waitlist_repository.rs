use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument};

use super::PostgrestClient;
use crate::models::{NewWaitlistEntry, RepositoryResult};

#[async_trait]
pub trait WaitlistRepository: Send + Sync {
    /// Insert a signup; a second insert for the same email fails with `UniqueViolation`
    async fn insert(&self, entry: NewWaitlistEntry) -> RepositoryResult<()>;
}

/// PostgREST implementation of the WaitlistRepository trait
pub struct PostgrestWaitlistRepository {
    client: Arc<PostgrestClient>,
    table_name: String,
}

impl PostgrestWaitlistRepository {
    pub fn new(client: Arc<PostgrestClient>, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl WaitlistRepository for PostgrestWaitlistRepository {
    #[instrument(skip(self, entry), fields(table = %self.table_name, source = %entry.source))]
    async fn insert(&self, entry: NewWaitlistEntry) -> RepositoryResult<()> {
        info!("Inserting waitlist entry");

        self.client.insert(&self.table_name, &entry).await
    }
}
