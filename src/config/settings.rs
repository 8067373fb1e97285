use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub inbox: InboxConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend: "memory" (default) or "postgres"
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Default page size for listing endpoints
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
    /// Hard cap on requested page size
    #[serde(default = "default_max_page_limit")]
    pub max_page_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Maximum number of concurrent delivery attempts per send
    #[serde(default = "default_max_concurrent_deliveries")]
    pub max_concurrent_deliveries: usize,
    /// Per-recipient delivery timeout in milliseconds
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboxConfig {
    /// Maximum number of inbox entries kept per account
    #[serde(default = "default_max_entries_per_account")]
    pub max_entries_per_account: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the scheduled-send background task runs
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    /// Poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum due notifications sent per poll
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8082
}

fn default_store_backend() -> String {
    "memory".to_string()
}

fn default_database_url() -> String {
    "postgres://localhost:5432/waqf".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_idle_timeout() -> u32 {
    300
}

fn default_page_limit() -> u32 {
    50
}

fn default_max_page_limit() -> u32 {
    200
}

fn default_max_concurrent_deliveries() -> usize {
    100
}

fn default_delivery_timeout_ms() -> u64 {
    5000
}

fn default_max_entries_per_account() -> usize {
    200
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    30
}

fn default_batch_size() -> usize {
    20
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8082)?
            .set_default("database.backend", "memory")?
            .set_default("api.default_page_limit", 50)?
            .set_default("broadcast.max_concurrent_deliveries", 100)?
            .set_default("broadcast.delivery_timeout_ms", 5000)?
            .set_default("scheduler.poll_interval_seconds", 30)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, DATABASE_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_database_url(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            default_page_limit: default_page_limit(),
            max_page_limit: default_max_page_limit(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_concurrent_deliveries: default_max_concurrent_deliveries(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
        }
    }
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            max_entries_per_account: default_max_entries_per_account(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            poll_interval_seconds: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8082);

        let broadcast = BroadcastConfig::default();
        assert_eq!(broadcast.max_concurrent_deliveries, 100);
        assert_eq!(broadcast.delivery_timeout_ms, 5000);

        let database = DatabaseConfig::default();
        assert_eq!(database.backend, "memory");
    }

    #[test]
    fn test_scheduler_defaults() {
        let scheduler = SchedulerConfig::default();
        assert!(scheduler.enabled);
        assert_eq!(scheduler.poll_interval_seconds, 30);
        assert_eq!(scheduler.batch_size, 20);
    }
}
