#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use uuid::Uuid;

use vidhost_rs::handlers::AppState;
use vidhost_rs::models::{
    AuthError, AuthSession, AuthUser, Channel, NewVideo, NewWaitlistEntry, ProviderError,
    ProviderResult, RepositoryError, RepositoryResult, Video, VideoPatch,
};
use vidhost_rs::observability::{BusinessTracingMiddleware, Metrics};
use vidhost_rs::repositories::{ChannelRepository, VideoRepository, WaitlistRepository};
use vidhost_rs::services::{
    AuthProvider, DirectUpload, DirectUploadRequest, UploadService, UploadSettings, VideoProvider,
    WaitlistService, WebhookService, WebhookVerifier,
};
use vidhost_rs::{create_app, HttpSettings};

pub const WEBHOOK_SECRET: &str = "whsec-integration";
pub const VALID_TOKEN: &str = "valid-access-token";
pub const OTHER_TOKEN: &str = "other-access-token";
pub const VALID_REFRESH_TOKEN: &str = "valid-refresh-token";
pub const REFRESHED_TOKEN: &str = "refreshed-access-token";

/// Auth provider backed by a fixed token table
pub struct FakeAuthProvider {
    users: HashMap<String, AuthUser>,
}

#[async_trait]
impl AuthProvider for FakeAuthProvider {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.users
            .get(access_token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        if refresh_token != VALID_REFRESH_TOKEN {
            return Err(AuthError::InvalidToken);
        }
        Ok(AuthSession {
            access_token: REFRESHED_TOKEN.to_string(),
            refresh_token: "rotated-refresh-token".to_string(),
            expires_in: Some(3600),
            expires_at: None,
        })
    }
}

#[derive(Default)]
pub struct InMemoryChannels {
    channels: Mutex<HashMap<Uuid, Channel>>,
}

#[async_trait]
impl ChannelRepository for InMemoryChannels {
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>> {
        Ok(self.channels.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryVideos {
    videos: Mutex<HashMap<Uuid, Video>>,
}

fn apply_patch(video: &mut Video, patch: VideoPatch) {
    if let Some(status) = patch.status {
        video.status = status;
    }
    if let Some(upload_id) = patch.mux_upload_id {
        video.mux_upload_id = Some(upload_id);
    }
    if let Some(asset_id) = patch.mux_asset_id {
        video.mux_asset_id = Some(asset_id);
    }
    if let Some(playback_id) = patch.mux_playback_id {
        video.mux_playback_id = Some(playback_id);
    }
    if let Some(duration) = patch.duration_seconds {
        video.duration_seconds = Some(duration);
    }
    video.updated_at = patch.updated_at.unwrap_or_else(Utc::now);
}

impl InMemoryVideos {
    pub fn all(&self) -> Vec<Video> {
        self.videos.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        self.videos.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideos {
    async fn create(&self, video: NewVideo) -> RepositoryResult<Video> {
        let now = Utc::now();
        let row = Video {
            id: video.id,
            channel_id: video.channel_id,
            owner_id: video.owner_id,
            title: video.title,
            description: video.description,
            status: video.status,
            mux_upload_id: None,
            mux_asset_id: None,
            mux_playback_id: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
        };
        self.videos.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: Uuid, patch: VideoPatch) -> RepositoryResult<Video> {
        let mut videos = self.videos.lock().unwrap();
        let video = videos.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply_patch(video, patch);
        Ok(video.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Video>> {
        Ok(self.get(id))
    }

    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: VideoPatch,
    ) -> RepositoryResult<Option<Video>> {
        let mut videos = self.videos.lock().unwrap();
        let Some(video) = videos
            .values_mut()
            .find(|v| v.mux_upload_id.as_deref() == Some(upload_id))
        else {
            return Ok(None);
        };
        apply_patch(video, patch);
        Ok(Some(video.clone()))
    }
}

/// Waitlist store enforcing the unique email constraint
#[derive(Default)]
pub struct InMemoryWaitlist {
    emails: Mutex<HashSet<String>>,
    delay: Option<Duration>,
}

impl InMemoryWaitlist {
    /// Store that stalls every insert
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.emails.lock().unwrap().len()
    }
}

#[async_trait]
impl WaitlistRepository for InMemoryWaitlist {
    async fn insert(&self, entry: NewWaitlistEntry) -> RepositoryResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.emails.lock().unwrap().insert(entry.email) {
            return Err(RepositoryError::UniqueViolation {
                message: "duplicate key value violates unique constraint \"waitlist_email_key\""
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeVideoProvider {
    pub fail_uploads: bool,
    pub requests: Mutex<Vec<DirectUploadRequest>>,
}

#[async_trait]
impl VideoProvider for FakeVideoProvider {
    async fn create_direct_upload(
        &self,
        request: DirectUploadRequest,
    ) -> ProviderResult<DirectUpload> {
        if self.fail_uploads {
            return Err(ProviderError::Api {
                status: 500,
                message: "upstream exploded".to_string(),
            });
        }
        let id = format!("upload-{}", request.video_id.simple());
        self.requests.lock().unwrap().push(request);
        Ok(DirectUpload {
            url: format!("https://storage.googleapis.com/video-storage/{}", id),
            id,
            status: Some("waiting".to_string()),
        })
    }

    async fn cancel_upload(&self, _upload_id: &str) -> ProviderResult<()> {
        Ok(())
    }
}

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub user: AuthUser,
    pub other_user: AuthUser,
    pub own_channel: Uuid,
    pub foreign_channel: Uuid,
    pub videos: Arc<InMemoryVideos>,
    pub waitlist: Arc<InMemoryWaitlist>,
    pub provider: Arc<FakeVideoProvider>,
    pub verifier: WebhookVerifier,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_provider(FakeVideoProvider::default()).await
    }

    pub async fn with_provider(provider: FakeVideoProvider) -> Self {
        Self::build(
            provider,
            InMemoryWaitlist::default(),
            Duration::from_secs(5),
        )
        .await
    }

    pub async fn with_slow_waitlist(delay: Duration, request_timeout: Duration) -> Self {
        Self::build(
            FakeVideoProvider::default(),
            InMemoryWaitlist::slow(delay),
            request_timeout,
        )
        .await
    }

    async fn build(
        provider: FakeVideoProvider,
        waitlist: InMemoryWaitlist,
        request_timeout: Duration,
    ) -> Self {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("creator@example.com".to_string()),
            user_metadata: json!({
                "full_name": "Casey Creator",
                "avatar_url": "https://lh3.googleusercontent.com/a/avatar"
            }),
        };
        let other_user = AuthUser {
            id: Uuid::new_v4(),
            email: Some("someone@example.com".to_string()),
            user_metadata: json!({ "avatar_url": "javascript:alert(1)" }),
        };

        let own_channel = Uuid::new_v4();
        let foreign_channel = Uuid::new_v4();
        let channels = InMemoryChannels::default();
        {
            let mut rows = channels.channels.lock().unwrap();
            rows.insert(
                own_channel,
                Channel {
                    id: own_channel,
                    owner_id: user.id,
                },
            );
            rows.insert(
                foreign_channel,
                Channel {
                    id: foreign_channel,
                    owner_id: other_user.id,
                },
            );
        }

        let mut users = HashMap::new();
        users.insert(VALID_TOKEN.to_string(), user.clone());
        users.insert(REFRESHED_TOKEN.to_string(), user.clone());
        users.insert(OTHER_TOKEN.to_string(), other_user.clone());
        let auth: Arc<dyn AuthProvider> = Arc::new(FakeAuthProvider { users });

        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let videos = Arc::new(InMemoryVideos::default());
        let waitlist = Arc::new(waitlist);
        let provider = Arc::new(provider);
        let verifier = WebhookVerifier::new(WEBHOOK_SECRET, 300);

        let state = AppState {
            uploads: Arc::new(UploadService::new(
                Arc::new(channels),
                videos.clone(),
                provider.clone(),
                UploadSettings {
                    cors_origin: "http://localhost:3000".to_string(),
                    playback_policy: "public".to_string(),
                },
                BusinessTracingMiddleware::new(metrics.clone()),
            )),
            waitlist: Arc::new(WaitlistService::new(waitlist.clone(), metrics.clone())),
            webhooks: Arc::new(WebhookService::new(
                videos.clone(),
                verifier.clone(),
                BusinessTracingMiddleware::new(metrics.clone()),
            )),
            auth,
            metrics,
        };

        let app = create_app(
            state,
            HttpSettings {
                request_timeout,
                max_request_size: 64 * 1024,
                secure_cookies: false,
            },
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            client: Client::new(),
            base_url,
            user,
            other_user,
            own_channel,
            foreign_channel,
            videos,
            waitlist,
            provider,
            verifier,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
