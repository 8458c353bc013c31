// Services module - business logic layer

pub mod auth_service;
pub mod upload_service;
pub mod video_provider;
pub mod waitlist_service;
pub mod webhook_service;

pub use auth_service::{AuthProvider, SupabaseAuthClient};
pub use upload_service::{UploadService, UploadSettings};
pub use video_provider::{DirectUpload, DirectUploadRequest, MuxClient, VideoProvider};
pub use waitlist_service::WaitlistService;
pub use webhook_service::{WebhookService, WebhookVerifier};
