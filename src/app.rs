use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::{Config, ServerConfig};
use crate::handlers::{
    handle_panic, handle_timeout, health_check, landing::landing_page, metrics_handler, not_found,
    profile::get_profile, request_validation_middleware, security_headers_middleware,
    session_refresh_middleware, videos::upload_video, waitlist::join_waitlist,
    webhooks::mux_webhook, AppState, SessionRefresh,
};
use crate::observability::{observability_middleware, BusinessTracingMiddleware, Metrics};
use crate::repositories::{
    PostgrestChannelRepository, PostgrestClient, PostgrestVideoRepository,
    PostgrestWaitlistRepository,
};
use crate::services::{
    AuthProvider, MuxClient, SupabaseAuthClient, UploadService, UploadSettings, WaitlistService,
    WebhookService, WebhookVerifier,
};

/// Request limits applied by the router layers
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub request_timeout: Duration,
    pub max_request_size: usize,
    pub secure_cookies: bool,
}

impl From<&ServerConfig> for HttpSettings {
    fn from(server: &ServerConfig) -> Self {
        Self {
            request_timeout: server.request_timeout(),
            max_request_size: server.max_request_size,
            secure_cookies: server.secure_cookies,
        }
    }
}

/// Wire the Supabase and Mux clients into services
pub fn build_state(config: &Config, metrics: Arc<Metrics>) -> Result<AppState, reqwest::Error> {
    let http = reqwest::Client::builder()
        .timeout(config.server.upstream_timeout())
        .build()?;

    let postgrest = Arc::new(PostgrestClient::new(
        http.clone(),
        &config.supabase.supabase_url,
        config.supabase.supabase_service_role_key.clone(),
        metrics.clone(),
    ));
    let channels = Arc::new(PostgrestChannelRepository::new(
        postgrest.clone(),
        config.supabase.channels_table.clone(),
    ));
    let videos = Arc::new(PostgrestVideoRepository::new(
        postgrest.clone(),
        config.supabase.videos_table.clone(),
    ));
    let waitlist = Arc::new(PostgrestWaitlistRepository::new(
        postgrest,
        config.supabase.waitlist_table.clone(),
    ));

    let auth: Arc<dyn AuthProvider> = Arc::new(SupabaseAuthClient::new(
        http.clone(),
        &config.supabase.supabase_url,
        config.supabase.supabase_anon_key.clone(),
    ));
    let mux = Arc::new(MuxClient::new(
        http,
        &config.mux.mux_api_url,
        config.mux.mux_token_id.clone(),
        config.mux.mux_token_secret.clone(),
        metrics.clone(),
    ));

    let uploads = UploadService::new(
        channels,
        videos.clone(),
        mux,
        UploadSettings {
            cors_origin: config.server.public_site_url.clone(),
            playback_policy: config.mux.mux_playback_policy.clone(),
        },
        BusinessTracingMiddleware::new(metrics.clone()),
    );
    let webhooks = WebhookService::new(
        videos,
        WebhookVerifier::new(
            config.mux.mux_webhook_secret.clone(),
            config.mux.mux_webhook_tolerance_seconds,
        ),
        BusinessTracingMiddleware::new(metrics.clone()),
    );

    Ok(AppState {
        uploads: Arc::new(uploads),
        waitlist: Arc::new(WaitlistService::new(waitlist, metrics.clone())),
        webhooks: Arc::new(webhooks),
        auth,
        metrics,
    })
}

/// Build the router with every route and middleware layer
pub fn create_app(state: AppState, settings: HttpSettings) -> Router {
    let metrics_for_middleware = state.metrics.clone();
    let session = SessionRefresh {
        auth: state.auth.clone(),
        secure_cookies: settings.secure_cookies,
    };
    let max_request_size = settings.max_request_size;

    // Public routes that take a body; authenticated routes check the body after auth
    let public_bodies = Router::new()
        .route("/api/waitlist", post(join_waitlist))
        .route("/api/webhooks/mux", post(mux_webhook))
        .route_layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }));

    Router::new()
        .route("/", get(landing_page))
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/me", get(get_profile))
        .route("/api/videos/upload", post(upload_video))
        .merge(public_bodies)
        .fallback(not_found)
        .with_state(state)
        // Layers run outer to inner from the bottom up
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(settings.request_timeout)),
        )
        .layer(middleware::from_fn(move |req, next| {
            session_refresh_middleware(session.clone(), req, next)
        }))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
