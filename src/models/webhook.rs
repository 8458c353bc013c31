use serde::{Deserialize, Serialize};

/// Envelope of a Mux webhook delivery; only the fields the service reads
#[derive(Debug, Clone, Deserialize)]
pub struct MuxWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: MuxEventData,
}

/// `data` of an upload or asset event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MuxEventData {
    /// Upload id for `video.upload.*`, asset id for `video.asset.*`
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub passthrough: Option<String>,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub new_asset_settings: Option<AssetSettingsEcho>,
}

impl MuxEventData {
    /// Our video id, from the asset itself or from the upload's asset settings
    pub fn passthrough(&self) -> Option<&str> {
        self.passthrough
            .as_deref()
            .or_else(|| {
                self.new_asset_settings
                    .as_ref()
                    .and_then(|settings| settings.passthrough.as_deref())
            })
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetSettingsEcho {
    #[serde(default)]
    pub passthrough: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaybackId {
    pub id: String,
    #[serde(default)]
    pub policy: Option<String>,
}

/// Data returned to the provider once a delivery is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookReceipt {
    pub received: bool,
}
