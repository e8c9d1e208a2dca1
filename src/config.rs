use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_DAILY_CAP: u32 = 7;
const DEFAULT_ROUTING_BASE_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const DEFAULT_ON_ROAD_TEMPLATE: &str =
    "Sayın {partner}, siparişiniz yola çıkmıştır. Teslimat belgesi: {document}";
const DEFAULT_DELIVERED_TEMPLATE: &str =
    "Sayın {partner}, teslimatınız tamamlanmıştır. Teşekkürler. Teslimat belgesi: {document}";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    #[validate]
    pub server: ServerConfig,

    #[serde(default)]
    #[validate]
    pub database: DatabaseConfig,

    #[serde(default)]
    #[validate]
    pub logging: LoggingConfig,

    #[serde(default)]
    #[validate]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    #[validate]
    pub routing: RoutingConfig,

    #[serde(default)]
    #[validate]
    pub sms: SmsConfig,

    /// Capacity of the in-process domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (1024-65535)
    #[serde(default = "default_port")]
    #[validate(range(min = 1024, max = 65535))]
    pub port: u16,

    /// Per-request timeout applied by the HTTP layer
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Whether to run database migrations on startup
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_db_max_connections(),
            min_connections: default_db_min_connections(),
            connect_timeout_secs: default_db_connect_timeout_secs(),
            idle_timeout_secs: default_db_idle_timeout_secs(),
            acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auto_migrate: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Where district/weekday compatibility is looked up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// Static two-region table compiled into the binary.
    #[default]
    Builtin,
    /// Admin-managed rule rows only.
    Records,
    /// Rule rows when any exist, otherwise the static table.
    RecordsWithBuiltinFallback,
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub rule_source: RuleSource,

    /// Maximum deliveries per (date, vehicle class)
    #[serde(default = "default_daily_cap")]
    #[validate(range(min = 1))]
    pub daily_cap: u32,

    /// Principals exempt from the daily cap
    #[serde(default)]
    pub unlimited_users: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            rule_source: RuleSource::default(),
            daily_cap: DEFAULT_DAILY_CAP,
            unlimited_users: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Directions API key; optimization is refused while unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_routing_base_url")]
    #[validate(url)]
    pub base_url: String,

    #[serde(default = "default_routing_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_routing_base_url(),
            timeout_secs: default_routing_timeout_secs(),
        }
    }
}

impl RoutingConfig {
    /// Returns the API key when one is configured and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// HTTP gateway endpoint; messages are only logged when unset
    #[serde(default)]
    pub gateway_url: Option<String>,

    #[serde(default = "default_sms_timeout_secs")]
    pub timeout_secs: u64,

    /// Template with `{partner}` and `{document}` placeholders
    #[serde(default = "default_on_road_template")]
    #[validate(length(min = 1))]
    pub on_road_template: String,

    #[serde(default = "default_delivered_template")]
    #[validate(length(min = 1))]
    pub delivered_template: String,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            timeout_secs: default_sms_timeout_secs(),
            on_road_template: default_on_road_template(),
            delivered_template: default_delivered_template(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            delivery: DeliveryConfig::default(),
            routing: RoutingConfig::default(),
            sms: SmsConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn log_level(&self) -> &str {
        &self.logging.level
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_database_url() -> String {
    "sqlite://delivery.db?mode=rwc".to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_true_bool() -> bool {
    true
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_daily_cap() -> u32 {
    DEFAULT_DAILY_CAP
}
fn default_routing_base_url() -> String {
    DEFAULT_ROUTING_BASE_URL.to_string()
}
fn default_routing_timeout_secs() -> u64 {
    15
}
fn default_sms_timeout_secs() -> u64 {
    10
}
fn default_on_road_template() -> String {
    DEFAULT_ON_ROAD_TEMPLATE.to_string()
}
fn default_delivered_template() -> String {
    DEFAULT_DELIVERED_TEMPLATE.to_string()
}
fn default_event_channel_capacity() -> usize {
    1024
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("delivery_management={},tower_http=debug", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__SECTION__KEY)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

pub fn load_config_from(config_dir: &str) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(config_dir).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", config_dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        rule_source = ?app_config.delivery.rule_source,
        daily_cap = app_config.delivery.daily_cap,
        "Configuration loaded successfully"
    );
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.delivery.daily_cap, 7);
        assert_eq!(cfg.delivery.rule_source, RuleSource::Builtin);
        assert!(cfg.routing.api_key().is_none());
    }

    #[test]
    fn blank_routing_key_counts_as_missing() {
        let mut cfg = RoutingConfig::default();
        cfg.api_key = Some("   ".into());
        assert!(cfg.api_key().is_none());
        cfg.api_key = Some("abc".into());
        assert_eq!(cfg.api_key(), Some("abc"));
    }

    #[test]
    fn zero_daily_cap_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.delivery.daily_cap = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn loads_sections_from_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
            [delivery]
            rule_source = "records_with_builtin_fallback"
            daily_cap = 5
            unlimited_users = ["dispatcher"]

            [routing]
            api_key = "test-key"
            "#,
        );

        let cfg = load_config_from(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.delivery.daily_cap, 5);
        assert_eq!(
            cfg.delivery.rule_source,
            RuleSource::RecordsWithBuiltinFallback
        );
        assert_eq!(cfg.delivery.unlimited_users, vec!["dispatcher".to_string()]);
        assert_eq!(cfg.routing.api_key(), Some("test-key"));
        assert_eq!(cfg.server.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
            [delivery]
            daily_cap = 0
            "#,
        );

        let result = load_config_from(dir.path().to_str().unwrap());
        assert!(matches!(result, Err(AppConfigError::Validation(_))));
    }
}
