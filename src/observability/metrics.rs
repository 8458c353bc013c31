use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    #[error("Failed to encode metrics: {0}")]
    Encoding(String),
}

/// Prometheus metrics for the vidhost service
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // HTTP metrics
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_in_flight: GaugeVec,

    // Backing store metrics
    pub database_operations_total: CounterVec,
    pub database_operation_duration_seconds: HistogramVec,

    // Video provider metrics
    pub provider_requests_total: CounterVec,
    pub provider_request_duration_seconds: HistogramVec,

    // Business metrics
    pub video_uploads_total: CounterVec,
    pub waitlist_signups_total: CounterVec,
    pub webhook_events_total: CounterVec,
    pub auth_checks_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics instance with all required metrics registered
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        info!("Initializing Prometheus metrics");

        let http_requests_total = CounterVec::new(
            Opts::new(
                "http_requests_total",
                "Total number of HTTP requests processed",
            ),
            &["method", "endpoint", "status_code"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;

        let http_requests_in_flight = GaugeVec::new(
            Opts::new(
                "http_requests_in_flight",
                "Number of HTTP requests currently being processed",
            ),
            &["method", "endpoint"],
        )?;

        let database_operations_total = CounterVec::new(
            Opts::new(
                "database_operations_total",
                "Total number of backing store operations",
            ),
            &["operation", "table", "status"],
        )?;

        let database_operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "database_operation_duration_seconds",
                "Backing store operation duration in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["operation", "table"],
        )?;

        let provider_requests_total = CounterVec::new(
            Opts::new(
                "provider_requests_total",
                "Total number of video provider API calls",
            ),
            &["operation", "status"],
        )?;

        let provider_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "provider_request_duration_seconds",
                "Video provider API call duration in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["operation"],
        )?;

        let video_uploads_total = CounterVec::new(
            Opts::new(
                "video_uploads_total",
                "Total number of upload URL requests",
            ),
            &["status"],
        )?;

        let waitlist_signups_total = CounterVec::new(
            Opts::new(
                "waitlist_signups_total",
                "Total number of waitlist signup attempts",
            ),
            &["outcome"],
        )?;

        let webhook_events_total = CounterVec::new(
            Opts::new(
                "webhook_events_total",
                "Total number of provider webhook events received",
            ),
            &["event_type", "status"],
        )?;

        let auth_checks_total = CounterVec::new(
            Opts::new(
                "auth_checks_total",
                "Total number of request authentication checks",
            ),
            &["outcome"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(database_operations_total.clone()))?;
        registry.register(Box::new(database_operation_duration_seconds.clone()))?;
        registry.register(Box::new(provider_requests_total.clone()))?;
        registry.register(Box::new(provider_request_duration_seconds.clone()))?;
        registry.register(Box::new(video_uploads_total.clone()))?;
        registry.register(Box::new(waitlist_signups_total.clone()))?;
        registry.register(Box::new(webhook_events_total.clone()))?;
        registry.register(Box::new(auth_checks_total.clone()))?;

        info!("Prometheus metrics initialized successfully");

        Ok(Metrics {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            database_operations_total,
            database_operation_duration_seconds,
            provider_requests_total,
            provider_request_duration_seconds,
            video_uploads_total,
            waitlist_signups_total,
            webhook_events_total,
            auth_checks_total,
        })
    }

    /// Get the metrics registry for exposing metrics endpoint
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encode all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::Encoding(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::Encoding(e.to_string()))
    }

    /// Record HTTP request metrics
    pub fn record_http_request(
        &self,
        method: &str,
        endpoint: &str,
        status_code: u16,
        duration_seconds: f64,
    ) {
        let status_str = status_code.to_string();

        self.http_requests_total
            .with_label_values(&[method, endpoint, &status_str])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration_seconds);
    }

    /// Record backing store operation metrics
    pub fn record_database_operation(
        &self,
        operation: &str,
        table: &str,
        success: bool,
        duration_seconds: f64,
    ) {
        let status = if success { "success" } else { "error" };

        self.database_operations_total
            .with_label_values(&[operation, table, status])
            .inc();

        self.database_operation_duration_seconds
            .with_label_values(&[operation, table])
            .observe(duration_seconds);
    }

    /// Record video provider call metrics
    pub fn record_provider_request(&self, operation: &str, success: bool, duration_seconds: f64) {
        let status = if success { "success" } else { "error" };

        self.provider_requests_total
            .with_label_values(&[operation, status])
            .inc();

        self.provider_request_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_seconds);
    }

    /// Record an upload URL request outcome
    pub fn record_video_upload(&self, success: bool) {
        let status = if success { "success" } else { "error" };

        self.video_uploads_total.with_label_values(&[status]).inc();
    }

    /// Record a waitlist signup outcome (`joined`, `duplicate`, `error`)
    pub fn record_waitlist_signup(&self, outcome: &str) {
        self.waitlist_signups_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a webhook event
    pub fn record_webhook_event(&self, event_type: &str, success: bool) {
        let status = if success { "success" } else { "error" };

        self.webhook_events_total
            .with_label_values(&[event_type, status])
            .inc();
    }

    /// Record an authentication check (`authenticated`, `rejected`, `error`)
    pub fn record_auth_check(&self, outcome: &str) {
        self.auth_checks_total.with_label_values(&[outcome]).inc();
    }

    /// Increment in-flight requests
    pub fn increment_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .inc();
    }

    /// Decrement in-flight requests
    pub fn decrement_in_flight(&self, method: &str, endpoint: &str) {
        self.http_requests_in_flight
            .with_label_values(&[method, endpoint])
            .dec();
    }
}
