//! Application configuration.

use crate::error::{AppError, AppResult};
use ::config::{Config, Environment, File, FileFormat};
use mintfeed_core::Entry;
use mintfeed_dashboard::DashboardConfig;
use mintfeed_feed::{FeedClientConfig, StoreConfig};
use mintfeed_ws::ConnectionConfig;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides (`MINTFEED__WS__ENDPOINT`).
const ENV_PREFIX: &str = "MINTFEED";
const ENV_SEPARATOR: &str = "__";

/// Upstream connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsConfig {
    /// Feed endpoint (`ws://` or `wss://`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_reconnect_initial_delay_ms")]
    pub reconnect_initial_delay_ms: u64,
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    #[serde(default = "default_reconnect_jitter")]
    pub reconnect_jitter: f64,
    /// Consecutive failed attempts before giving up (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Transitions queued per status subscriber.
    #[serde(default = "default_status_buffer")]
    pub status_buffer: usize,
}

fn default_endpoint() -> String {
    "ws://localhost:8080/connect".to_string()
}

fn default_reconnect_initial_delay_ms() -> u64 {
    500
}

fn default_reconnect_multiplier() -> f64 {
    2.0
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_reconnect_jitter() -> f64 {
    0.2
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_status_buffer() -> usize {
    64
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            reconnect_initial_delay_ms: default_reconnect_initial_delay_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_jitter: default_reconnect_jitter(),
            max_reconnect_attempts: 0,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            status_buffer: default_status_buffer(),
        }
    }
}

impl WsConfig {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            reconnect_initial_delay_ms: self.reconnect_initial_delay_ms,
            reconnect_multiplier: self.reconnect_multiplier,
            reconnect_max_delay_ms: self.reconnect_max_delay_ms,
            reconnect_jitter: self.reconnect_jitter,
            max_reconnect_attempts: self.max_reconnect_attempts,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            heartbeat_timeout_ms: self.heartbeat_timeout_ms,
        }
    }
}

/// Feed store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default)]
    pub allow_duplicates: bool,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// Entries inserted before the connection starts.
    #[serde(default)]
    pub seed: Vec<Entry>,
}

fn default_max_entries() -> usize {
    1000
}

fn default_subscriber_buffer() -> usize {
    256
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            allow_duplicates: false,
            subscriber_buffer: default_subscriber_buffer(),
            seed: Vec::new(),
        }
    }
}

impl FeedConfig {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_entries: self.max_entries,
            allow_duplicates: self.allow_duplicates,
            subscriber_buffer: self.subscriber_buffer,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ws: WsConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load a TOML file with `MINTFEED__SECTION__KEY` environment overrides on top.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let config = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Parse a TOML string without environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Reject settings the feed cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let ws = &self.ws;
        mintfeed_ws::parse_endpoint(&ws.endpoint)
            .map_err(|e| AppError::Config(e.to_string()))?;

        if ws.reconnect_multiplier < 1.0 {
            return Err(AppError::Config(format!(
                "ws.reconnect_multiplier must be >= 1.0, got {}",
                ws.reconnect_multiplier
            )));
        }
        if ws.reconnect_initial_delay_ms > ws.reconnect_max_delay_ms {
            return Err(AppError::Config(format!(
                "ws.reconnect_initial_delay_ms ({}) exceeds ws.reconnect_max_delay_ms ({})",
                ws.reconnect_initial_delay_ms, ws.reconnect_max_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&ws.reconnect_jitter) {
            return Err(AppError::Config(format!(
                "ws.reconnect_jitter must be within [0, 1], got {}",
                ws.reconnect_jitter
            )));
        }
        if ws.status_buffer == 0 {
            return Err(AppError::Config("ws.status_buffer must be > 0".to_string()));
        }

        let feed = &self.feed;
        if feed.max_entries == 0 {
            return Err(AppError::Config("feed.max_entries must be > 0".to_string()));
        }
        if feed.subscriber_buffer == 0 {
            return Err(AppError::Config(
                "feed.subscriber_buffer must be > 0".to_string(),
            ));
        }
        for entry in &feed.seed {
            entry
                .validate()
                .map_err(|e| AppError::Config(format!("Invalid seed entry: {e}")))?;
        }

        Ok(())
    }

    /// Settings for the feed client.
    pub fn client_config(&self) -> FeedClientConfig {
        FeedClientConfig {
            connection: self.ws.connection_config(),
            store: self.feed.store_config(),
            status_buffer: self.ws.status_buffer,
        }
    }
}
