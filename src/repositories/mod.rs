pub mod channel_repository;
pub mod postgrest;
pub mod video_repository;
pub mod waitlist_repository;

pub use channel_repository::{ChannelRepository, PostgrestChannelRepository};
pub use postgrest::PostgrestClient;
pub use video_repository::{PostgrestVideoRepository, VideoRepository};
pub use waitlist_repository::{PostgrestWaitlistRepository, WaitlistRepository};
