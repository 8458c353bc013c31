use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self, RandomIdGenerator, Sampler, Tracer},
    Resource,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::config::ObservabilityConfig;

const SERVICE_NAMESPACE: &str = "vidhost";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to initialize OpenTelemetry: {0}")]
    OpenTelemetryInit(#[from] opentelemetry::trace::TraceError),
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install the global subscriber: env filter, human or JSON log lines, and
/// OTLP span export when the config names a collector.
pub fn init_observability(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let endpoint = collector_endpoint(config);
    let otel_layer = match endpoint {
        Some(endpoint) => Some(OpenTelemetryLayer::new(otlp_tracer(config, endpoint)?)),
        None => None,
    };

    let fmt_layer = if config.enable_json_logging {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(default_filter(&config.service_name))
        .with(otel_layer)
        .with(fmt_layer.with_filter(LevelFilter::INFO))
        .try_init()
        .map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.deployment_environment,
        otlp_export = endpoint.is_some(),
        "Observability initialized"
    );
    Ok(())
}

/// Configured collector, ignoring blank values
fn collector_endpoint(config: &ObservabilityConfig) -> Option<&str> {
    config
        .otlp_endpoint
        .as_deref()
        .map(str::trim)
        .filter(|endpoint| !endpoint.is_empty())
}

/// `RUST_LOG` wins; otherwise this crate at info and the HTTP clients at warn
fn default_filter(service_name: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,vidhost_rs=info,reqwest=warn,hyper=warn,aws_config=warn",
            service_name.replace('-', "_")
        ))
    })
}

/// Attributes stamped on every exported span
fn service_resource(config: &ObservabilityConfig) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("service.namespace", SERVICE_NAMESPACE),
        KeyValue::new(
            "deployment.environment",
            config.deployment_environment.clone(),
        ),
    ])
}

fn otlp_tracer(config: &ObservabilityConfig, endpoint: &str) -> Result<Tracer, ObservabilityError> {
    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_secs(10));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(service_resource(config)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    Ok(tracer)
}

/// Trace id of the active span, when it belongs to a sampled OTLP trace
pub fn get_current_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = tracing::Span::current().context();
    let span_context = context.span().span_context().clone();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_with_trace {
    ($level:ident, $($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::$level!(trace_id = %trace_id, $($arg)*),
            None => tracing::$level!($($arg)*),
        }
    };
}

/// `tracing::info!` plus the current trace id
#[macro_export]
macro_rules! info_with_trace {
    ($($arg:tt)*) => { $crate::__log_with_trace!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn_with_trace {
    ($($arg:tt)*) => { $crate::__log_with_trace!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! error_with_trace {
    ($($arg:tt)*) => { $crate::__log_with_trace!(error, $($arg)*) };
}

/// Flush buffered spans, giving up after a short grace period
pub async fn shutdown_observability() {
    let flush = tokio::task::spawn_blocking(global::shutdown_tracer_provider);

    match tokio::time::timeout(SHUTDOWN_GRACE, flush).await {
        Ok(Ok(())) => info!("Span exporter flushed"),
        Ok(Err(e)) => warn!(error = %e, "Span exporter shutdown failed"),
        Err(_) => warn!(
            grace_seconds = SHUTDOWN_GRACE.as_secs(),
            "Span exporter did not flush in time"
        ),
    }
}
