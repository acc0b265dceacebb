use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the poll service REST API
    pub rest_url: String,
    /// Live event stream endpoint
    pub ws_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Per-request timeout for REST calls in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Interval between client pings in seconds
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    15
}

fn default_ping_interval() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            ping_interval_secs: default_ping_interval(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }
}

/// Transport-level reconnect policy.
///
/// The sync core never reconnects on its own; this only drives the WebSocket
/// adapter's retry loop.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Retry after the connection drops
    #[serde(default = "default_reconnect_enabled")]
    pub enabled: bool,
    /// Delay before the first retry, multiplied by the attempt number
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound on the retry delay
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconnect_enabled(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl ReconnectConfig {
    /// Linear backoff capped at `max_delay_ms` (jitter is added by the caller)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_ms.saturating_mul(attempt.max(1) as u64);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rolling log files
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("server.rest_url", "http://localhost:8000")?
            .set_default("server.ws_url", "ws://localhost:8000/ws")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("QUICKPOLL_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (QUICKPOLL_SERVER__REST_URL, etc.)
            .add_source(
                Environment::with_prefix("QUICKPOLL")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(rest_url: &str, ws_url: &str) -> Self {
        Self {
            server: ServerConfig {
                rest_url: rest_url.to_string(),
                ws_url: ws_url.to_string(),
            },
            connection: ConnectionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match Url::parse(&self.server.rest_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "rest_url must use http or https, got {}",
                url.scheme()
            )),
            Err(e) => errors.push(format!("rest_url is not a valid URL: {}", e)),
        }

        match Url::parse(&self.server.ws_url) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => errors.push(format!("ws_url must use ws or wss, got {}", url.scheme())),
            Err(e) => errors.push(format!("ws_url is not a valid URL: {}", e)),
        }

        if self.connection.connect_timeout_secs == 0 {
            errors.push("connect_timeout_secs must be positive".to_string());
        }

        if self.connection.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be positive".to_string());
        }

        if self.connection.ping_interval_secs == 0 {
            errors.push("ping_interval_secs must be positive".to_string());
        }

        let reconnect = &self.connection.reconnect;
        if reconnect.enabled && reconnect.base_delay_ms > reconnect.max_delay_ms {
            errors.push(
                "reconnect.base_delay_ms must not exceed reconnect.max_delay_ms".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
