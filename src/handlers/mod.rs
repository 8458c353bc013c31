use axum::extract::FromRef;
use std::sync::Arc;

use crate::observability::Metrics;
use crate::services::{AuthProvider, UploadService, WaitlistService, WebhookService};

pub mod auth;
pub mod health;
pub mod landing;
pub mod metrics;
pub mod middleware;
pub mod profile;
pub mod responses;
pub mod videos;
pub mod waitlist;
pub mod webhooks;

pub use auth::{AuthenticatedUser, RefreshedAccessToken};
pub use health::*;
pub use metrics::*;
pub use middleware::*;
pub use responses::{
    error_response, handle_panic, handle_timeout, not_found, service_error_to_response, ApiError,
};

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub uploads: Arc<UploadService>,
    pub waitlist: Arc<WaitlistService>,
    pub webhooks: Arc<WebhookService>,
    pub auth: Arc<dyn AuthProvider>,
    pub metrics: Arc<Metrics>,
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}
