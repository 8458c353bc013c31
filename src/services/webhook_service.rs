use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    MuxWebhookEvent, RepositoryError, ServiceResult, VideoPatch, VideoStatus, WebhookError,
    WebhookReceipt,
};
use crate::observability::BusinessTracingMiddleware;
use crate::repositories::VideoRepository;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the Mux webhook signature
pub const SIGNATURE_HEADER: &str = "mux-signature";

/// Parsed `t=<unix>,v1=<hex>[,v1=<hex>...]` signature header
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

pub fn parse_signature_header(value: &str) -> Result<SignatureHeader, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in value.split(',') {
        let (key, val) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| WebhookError::MalformedSignature {
                message: format!("unexpected segment: {}", part.trim()),
            })?;

        match key {
            "t" => {
                timestamp = Some(val.parse::<i64>().map_err(|_| {
                    WebhookError::MalformedSignature {
                        message: "timestamp is not an integer".to_string(),
                    }
                })?)
            }
            "v1" => signatures.push(hex::decode(val).map_err(|_| {
                WebhookError::MalformedSignature {
                    message: "signature is not hex".to_string(),
                }
            })?),
            // Unknown schemes are skipped
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| WebhookError::MalformedSignature {
        message: "missing timestamp".to_string(),
    })?;

    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature {
            message: "missing v1 signature".to_string(),
        });
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// HMAC-SHA256 verifier for Mux webhook deliveries
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: u64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds,
        }
    }

    fn mac(&self, timestamp: i64, body: &[u8]) -> Result<HmacSha256, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| WebhookError::InvalidSecret)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// Header value for `body` signed at `timestamp`
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
        let digest = self.mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("t={},v1={}", timestamp, hex::encode(digest)))
    }

    /// Check the signature header against the raw body at time `now`
    pub fn verify(&self, header: Option<&str>, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let header = header
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        let parsed = parse_signature_header(header)?;

        // Untrusted timestamp, any i64
        let age_seconds = now.abs_diff(parsed.timestamp);
        if age_seconds > self.tolerance_seconds {
            return Err(WebhookError::StaleTimestamp { age_seconds });
        }

        let mac = self.mac(parsed.timestamp, body)?;
        let matched = parsed
            .signatures
            .iter()
            .any(|signature| mac.clone().verify_slice(signature).is_ok());

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}

/// Which video row an event applies to
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookTarget {
    Video(Uuid),
    Upload(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookAction {
    pub target: WebhookTarget,
    pub patch: VideoPatch,
}

fn asset_target(event: &MuxWebhookEvent) -> Result<WebhookTarget, WebhookError> {
    if let Some(passthrough) = event.data.passthrough() {
        return Uuid::parse_str(passthrough)
            .map(WebhookTarget::Video)
            .map_err(|_| WebhookError::InvalidPayload {
                message: format!("passthrough is not a video id: {}", passthrough),
            });
    }

    event
        .data
        .upload_id
        .clone()
        .map(WebhookTarget::Upload)
        .ok_or_else(|| WebhookError::InvalidPayload {
            message: "asset event has neither passthrough nor upload_id".to_string(),
        })
}

fn upload_target(event: &MuxWebhookEvent) -> Result<WebhookTarget, WebhookError> {
    event
        .data
        .id
        .clone()
        .map(WebhookTarget::Upload)
        .ok_or_else(|| WebhookError::InvalidPayload {
            message: "upload event has no id".to_string(),
        })
}

/// Decide what a delivery changes; `None` for event types the service ignores
pub fn plan_event(event: &MuxWebhookEvent) -> Result<Option<WebhookAction>, WebhookError> {
    let action = match event.event_type.as_str() {
        "video.upload.asset_created" => WebhookAction {
            target: upload_target(event)?,
            patch: VideoPatch {
                status: Some(VideoStatus::Processing),
                mux_asset_id: event.data.asset_id.clone(),
                ..Default::default()
            }
            .touched(),
        },
        "video.asset.ready" => WebhookAction {
            target: asset_target(event)?,
            patch: VideoPatch {
                status: Some(VideoStatus::Ready),
                mux_asset_id: event.data.id.clone(),
                mux_playback_id: event.data.playback_ids.first().map(|p| p.id.clone()),
                duration_seconds: event.data.duration,
                ..Default::default()
            }
            .touched(),
        },
        "video.asset.errored" => WebhookAction {
            target: asset_target(event)?,
            patch: VideoPatch {
                status: Some(VideoStatus::Errored),
                mux_asset_id: event.data.id.clone(),
                ..Default::default()
            }
            .touched(),
        },
        "video.upload.errored" | "video.upload.cancelled" => WebhookAction {
            target: upload_target(event)?,
            patch: VideoPatch::status(VideoStatus::Errored),
        },
        _ => return Ok(None),
    };

    Ok(Some(action))
}

/// Verifies and applies provider webhooks to video rows
pub struct WebhookService {
    videos: Arc<dyn VideoRepository>,
    verifier: WebhookVerifier,
    tracer: BusinessTracingMiddleware,
}

impl WebhookService {
    pub fn new(
        videos: Arc<dyn VideoRepository>,
        verifier: WebhookVerifier,
        tracer: BusinessTracingMiddleware,
    ) -> Self {
        Self {
            videos,
            verifier,
            tracer,
        }
    }

    #[instrument(skip_all, fields(body_bytes = body.len()))]
    pub async fn handle(
        &self,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> ServiceResult<WebhookReceipt> {
        if let Err(e) = self.verifier.verify(signature, body, now) {
            self.tracer.metrics().record_webhook_event("unverified", false);
            crate::warn_with_trace!(error = %e, "Rejected webhook delivery");
            return Err(e.into());
        }

        let event: MuxWebhookEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload {
                message: e.to_string(),
            })?;

        let Some(action) = plan_event(&event)? else {
            info!(event_type = %event.event_type, "Ignoring webhook event");
            self.tracer
                .metrics()
                .record_webhook_event(&event.event_type, true);
            return Ok(WebhookReceipt { received: true });
        };

        self.tracer
            .trace_webhook_event(&event.event_type, self.apply(action))
            .await?;

        Ok(WebhookReceipt { received: true })
    }

    async fn apply(&self, action: WebhookAction) -> ServiceResult<()> {
        let applied = match &action.target {
            WebhookTarget::Video(id) => match self.videos.update(*id, action.patch).await {
                Ok(_) => true,
                Err(RepositoryError::NotFound) => false,
                Err(e) => return Err(e.into()),
            },
            WebhookTarget::Upload(upload_id) => self
                .videos
                .update_by_upload_id(upload_id, action.patch)
                .await?
                .is_some(),
        };

        // Unknown rows are acknowledged so the provider stops redelivering
        if !applied {
            warn!(webhook_target = ?action.target, "Webhook matched no video row");
        }

        Ok(())
    }
}
