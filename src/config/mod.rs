use aws_config::BehaviorVersion;
use aws_sdk_ssm::Client as SsmClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const ENV_PREFIX: &str = "VIDHOST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("AWS SDK error: {source}")]
    AwsSdk {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Environment variable missing: {name}")]
    MissingEnvironmentVariable { name: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub supabase: SupabaseConfig,
    pub mux: MuxConfig,
    pub observability: ObservabilityConfig,
    pub secrets: SecretsConfig,
    pub parameter_store: Option<Arc<ParameterStoreConfig>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Origin the browser uploads from, sent to Mux as the CORS origin
    #[serde(default = "default_public_site_url")]
    pub public_site_url: String,
    #[serde(default)]
    pub secure_cookies: bool,
}

#[derive(Clone, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub supabase_service_role_key: String,
    #[serde(default = "default_videos_table")]
    pub videos_table: String,
    #[serde(default = "default_channels_table")]
    pub channels_table: String,
    #[serde(default = "default_waitlist_table")]
    pub waitlist_table: String,
}

#[derive(Clone, Deserialize)]
pub struct MuxConfig {
    #[serde(default = "default_mux_api_url")]
    pub mux_api_url: String,
    #[serde(default)]
    pub mux_token_id: String,
    #[serde(default)]
    pub mux_token_secret: String,
    #[serde(default)]
    pub mux_webhook_secret: String,
    #[serde(default = "default_playback_policy")]
    pub mux_playback_policy: String,
    #[serde(default = "default_webhook_tolerance")]
    pub mux_webhook_tolerance_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_deployment_environment")]
    pub deployment_environment: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default)]
    pub enable_json_logging: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    /// SSM path prefix for secrets left empty in the environment, e.g. `/vidhost/prod`
    #[serde(default)]
    pub ssm_parameter_prefix: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
}

pub struct ParameterStoreConfig {
    ssm_client: SsmClient,
    cache: Arc<RwLock<HashMap<String, (String, Instant)>>>,
    cache_ttl: Duration,
}

impl std::fmt::Debug for ParameterStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreConfig")
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_size", &"<runtime>")
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_anon_key", &redact(&self.supabase_anon_key))
            .field(
                "supabase_service_role_key",
                &redact(&self.supabase_service_role_key),
            )
            .field("videos_table", &self.videos_table)
            .field("channels_table", &self.channels_table)
            .field("waitlist_table", &self.waitlist_table)
            .finish()
    }
}

impl std::fmt::Debug for MuxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxConfig")
            .field("mux_api_url", &self.mux_api_url)
            .field("mux_token_id", &redact(&self.mux_token_id))
            .field("mux_token_secret", &redact(&self.mux_token_secret))
            .field("mux_webhook_secret", &redact(&self.mux_webhook_secret))
            .field("mux_playback_policy", &self.mux_playback_policy)
            .field(
                "mux_webhook_tolerance_seconds",
                &self.mux_webhook_tolerance_seconds,
            )
            .finish()
    }
}

/// Secrets that may be supplied through Parameter Store instead of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKey {
    SupabaseAnonKey,
    SupabaseServiceRoleKey,
    MuxTokenId,
    MuxTokenSecret,
    MuxWebhookSecret,
}

impl SecretKey {
    pub const ALL: [SecretKey; 5] = [
        SecretKey::SupabaseAnonKey,
        SecretKey::SupabaseServiceRoleKey,
        SecretKey::MuxTokenId,
        SecretKey::MuxTokenSecret,
        SecretKey::MuxWebhookSecret,
    ];

    /// Last path segment of the parameter in Parameter Store
    pub fn parameter_suffix(&self) -> &'static str {
        match self {
            SecretKey::SupabaseAnonKey => "supabase-anon-key",
            SecretKey::SupabaseServiceRoleKey => "supabase-service-role-key",
            SecretKey::MuxTokenId => "mux-token-id",
            SecretKey::MuxTokenSecret => "mux-token-secret",
            SecretKey::MuxWebhookSecret => "mux-webhook-secret",
        }
    }
}

pub fn parameter_name(prefix: &str, key: SecretKey) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), key.parameter_suffix())
}

impl Config {
    pub async fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let server = ServerConfig::from_env()?;
        let supabase = SupabaseConfig::from_env()?;
        let mux = MuxConfig::from_env()?;
        let observability = ObservabilityConfig::from_env()?;
        let secrets = SecretsConfig::from_env()?;

        let mut config = Config {
            server,
            supabase,
            mux,
            observability,
            secrets,
            parameter_store: None,
        };

        if let Some(prefix) = config.secrets.ssm_parameter_prefix.clone() {
            let aws_config = aws_config::defaults(BehaviorVersion::latest())
                .region(aws_config::Region::new(config.secrets.region.clone()))
                .load()
                .await;

            let parameter_store = Arc::new(ParameterStoreConfig::new(
                SsmClient::new(&aws_config),
                Duration::from_secs(5 * 60),
            ));

            config
                .resolve_missing_secrets(&parameter_store, &prefix)
                .await?;
            config.parameter_store = Some(parameter_store);
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Secrets that are still empty after reading the environment
    pub fn missing_secrets(&self) -> Vec<SecretKey> {
        SecretKey::ALL
            .into_iter()
            .filter(|key| self.secret(*key).is_empty())
            .collect()
    }

    fn secret(&self, key: SecretKey) -> &str {
        match key {
            SecretKey::SupabaseAnonKey => &self.supabase.supabase_anon_key,
            SecretKey::SupabaseServiceRoleKey => &self.supabase.supabase_service_role_key,
            SecretKey::MuxTokenId => &self.mux.mux_token_id,
            SecretKey::MuxTokenSecret => &self.mux.mux_token_secret,
            SecretKey::MuxWebhookSecret => &self.mux.mux_webhook_secret,
        }
    }

    fn set_secret(&mut self, key: SecretKey, value: String) {
        let slot = match key {
            SecretKey::SupabaseAnonKey => &mut self.supabase.supabase_anon_key,
            SecretKey::SupabaseServiceRoleKey => &mut self.supabase.supabase_service_role_key,
            SecretKey::MuxTokenId => &mut self.mux.mux_token_id,
            SecretKey::MuxTokenSecret => &mut self.mux.mux_token_secret,
            SecretKey::MuxWebhookSecret => &mut self.mux.mux_webhook_secret,
        };
        *slot = value;
    }

    async fn resolve_missing_secrets(
        &mut self,
        parameter_store: &ParameterStoreConfig,
        prefix: &str,
    ) -> Result<(), ConfigError> {
        for key in self.missing_secrets() {
            let name = parameter_name(prefix, key);
            info!(parameter = %name, "Resolving secret from Parameter Store");
            let value = parameter_store.get_parameter(&name).await?;
            self.set_secret(key, value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        info!("Validating configuration");

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Request timeout cannot be 0".to_string(),
            });
        }

        if self.server.upstream_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Upstream timeout cannot be 0".to_string(),
            });
        }

        if self.supabase.supabase_url.is_empty() {
            return Err(ConfigError::MissingEnvironmentVariable {
                name: format!("{}_SUPABASE_URL", ENV_PREFIX),
            });
        }

        url::Url::parse(&self.supabase.supabase_url).map_err(|e| {
            ConfigError::ValidationError {
                message: format!("Supabase URL is invalid: {}", e),
            }
        })?;

        url::Url::parse(&self.mux.mux_api_url).map_err(|e| ConfigError::ValidationError {
            message: format!("Mux API URL is invalid: {}", e),
        })?;

        if let Some(key) = self.missing_secrets().first() {
            return Err(ConfigError::ValidationError {
                message: format!("Secret {} is not configured", key.parameter_suffix()),
            });
        }

        if self.mux.mux_playback_policy != "public" && self.mux.mux_playback_policy != "signed" {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Unsupported playback policy: {}",
                    self.mux.mux_playback_policy
                ),
            });
        }

        if self.mux.mux_webhook_tolerance_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "Webhook tolerance cannot be 0".to_string(),
            });
        }

        if !self.server.secure_cookies && self.server.public_site_url.starts_with("https://") {
            warn!("Serving an https site without secure session cookies");
        }

        info!("Configuration validation completed");
        Ok(())
    }
}

fn load_settings(section: &str) -> Result<config::Config, ConfigError> {
    config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })
}

fn deserialize_section<T: serde::de::DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    load_settings(section)?
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        deserialize_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SupabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        deserialize_section("supabase")
    }
}

impl MuxConfig {
    fn from_env() -> Result<Self, ConfigError> {
        deserialize_section("mux")
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.mux_webhook_tolerance_seconds)
    }
}

impl ObservabilityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        deserialize_section("observability")
    }
}

impl SecretsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut secrets: SecretsConfig = deserialize_section("secrets")?;
        secrets.ssm_parameter_prefix = secrets
            .ssm_parameter_prefix
            .filter(|prefix| !prefix.trim().is_empty());
        Ok(secrets)
    }
}

impl ParameterStoreConfig {
    pub fn new(ssm_client: SsmClient, cache_ttl: Duration) -> Self {
        Self {
            ssm_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
            cache_ttl,
        }
    }

    pub async fn get_parameter(&self, name: &str) -> Result<String, ConfigError> {
        debug!("Getting parameter: {}", name);

        {
            let cache = self.cache.read().await;
            if let Some((value, timestamp)) = cache.get(name) {
                if timestamp.elapsed() < self.cache_ttl {
                    debug!("Parameter found in cache: {}", name);
                    return Ok(value.clone());
                }
                debug!("Parameter cache expired: {}", name);
            }
        }

        debug!("Fetching parameter from AWS SSM: {}", name);
        let result = self
            .ssm_client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| ConfigError::AwsSdk {
                source: Box::new(e),
            })?;

        let value = result
            .parameter()
            .and_then(|p| p.value())
            .ok_or_else(|| ConfigError::ParameterNotFound {
                name: name.to_string(),
            })?
            .to_string();

        {
            let mut cache = self.cache.write().await;
            cache.insert(name.to_string(), (value.clone(), Instant::now()));
        }

        debug!("Parameter retrieved and cached: {}", name);
        Ok(value)
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        cache.clear();
        info!("Parameter store cache cleared");
    }

    pub async fn cache_size(&self) -> usize {
        let cache = self.cache.read().await;
        cache.len()
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_upstream_timeout() -> u64 {
    10
}

pub(crate) fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

pub(crate) fn default_public_site_url() -> String {
    "http://localhost:3000".to_string()
}

pub(crate) fn default_videos_table() -> String {
    "videos".to_string()
}

pub(crate) fn default_channels_table() -> String {
    "channels".to_string()
}

pub(crate) fn default_waitlist_table() -> String {
    "waitlist".to_string()
}

pub(crate) fn default_mux_api_url() -> String {
    "https://api.mux.com".to_string()
}

pub(crate) fn default_playback_policy() -> String {
    "public".to_string()
}

pub(crate) fn default_webhook_tolerance() -> u64 {
    300
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_service_name() -> String {
    "vidhost-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_deployment_environment() -> String {
    "development".to_string()
}
