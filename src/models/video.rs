use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::VideoStatus;

/// Channel row; only the columns the upload path reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub owner_id: Uuid,
}

impl Channel {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }
}

/// Video row as stored in the `videos` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: VideoStatus,
    #[serde(default)]
    pub mux_upload_id: Option<String>,
    #[serde(default)]
    pub mux_asset_id: Option<String>,
    #[serde(default)]
    pub mux_playback_id: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new video row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideo {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: VideoStatus,
}

impl NewVideo {
    /// Build the row for a freshly requested upload
    pub fn uploading(
        channel_id: Uuid,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel_id,
            owner_id,
            title: title.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            status: VideoStatus::Uploading,
        }
    }
}

/// Partial update for a video row; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VideoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_upload_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux_playback_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VideoPatch {
    pub fn status(status: VideoStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
        .touched()
    }

    pub fn upload_id(upload_id: impl Into<String>) -> Self {
        Self {
            mux_upload_id: Some(upload_id.into()),
            ..Default::default()
        }
        .touched()
    }

    /// Stamp `updated_at` with the current time
    pub fn touched(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }
}

/// Body of `POST /api/videos/upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadRequest {
    pub channel_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Data returned by `POST /api/videos/upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub video_id: Uuid,
    pub upload_url: String,
    pub upload_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_video_is_uploading_and_trimmed() {
        let channel_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let video = NewVideo::uploading(channel_id, owner_id, "  My first clip ", Some("   "));

        assert_eq!(video.status, VideoStatus::Uploading);
        assert_eq!(video.title, "My first clip");
        assert_eq!(video.description, None);
        assert_eq!(video.channel_id, channel_id);
        assert_eq!(video.owner_id, owner_id);
    }

    #[test]
    fn test_channel_ownership() {
        let owner = Uuid::new_v4();
        let channel = Channel {
            id: Uuid::new_v4(),
            owner_id: owner,
        };

        assert!(channel.is_owned_by(owner));
        assert!(!channel.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn test_video_patch_skips_unset_fields() {
        let patch = VideoPatch::upload_id("upl_123");
        let value = serde_json::to_value(&patch).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["mux_upload_id"], "upl_123");
        assert!(object.contains_key("updated_at"));
        assert!(!object.contains_key("status"));
        assert!(!object.contains_key("mux_asset_id"));
    }

    #[test]
    fn test_upload_request_uses_camel_case() {
        let request: CreateUploadRequest = serde_json::from_value(json!({
            "channelId": "2f6c1c1e-8d8e-4d55-9a34-5a2f5d0e9a11",
            "title": "Launch day"
        }))
        .unwrap();

        assert_eq!(request.title, "Launch day");
        assert_eq!(request.description, None);

        let response = UploadResponse {
            video_id: Uuid::nil(),
            upload_url: "https://storage.example/upload".to_string(),
            upload_id: "upl_1".to_string(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("videoId").is_some());
        assert!(value.get("uploadUrl").is_some());
        assert!(value.get("uploadId").is_some());
    }

    #[test]
    fn test_video_row_deserializes_with_missing_provider_columns() {
        let video: Video = serde_json::from_value(json!({
            "id": "2f6c1c1e-8d8e-4d55-9a34-5a2f5d0e9a11",
            "channel_id": "5b0d5a9e-1f45-4c1e-8f0f-0d1c2b3a4e5f",
            "owner_id": "9a8b7c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d",
            "title": "Clip",
            "status": "uploading",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(video.status, VideoStatus::Uploading);
        assert!(video.mux_upload_id.is_none());
        assert!(video.duration_seconds.is_none());
    }
}
