//! Server configuration loading from file and environment variables.

use feed_ledger::MAX_SYNTHETIC_BATCH;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Token signing settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Downloadable log files.
    #[serde(default)]
    pub files: FilesConfig,

    /// Initial feed contents.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Background live-traffic simulation.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "feed_ledger=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Bearer token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret. When unset, a random secret is generated per process.
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Token lifetime in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

/// Location of downloadable files.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory served under `/api/files/`.
    #[serde(default = "default_files_dir")]
    pub dir: PathBuf,
}

/// Initial feed contents.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Load the demo events and demo user accounts at startup.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

/// Background simulation of live device traffic.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Seconds between synthetic batches. 0 disables the simulation.
    #[serde(default)]
    pub interval_secs: u64,

    /// Events per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_ttl() -> u64 {
    24 * 60 * 60
}

fn default_files_dir() -> PathBuf {
    PathBuf::from("./files")
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            dir: default_files_dir(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: default_true(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            batch_size: default_batch_size(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its accepted range.
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl Config {
    /// Checks ranges that the TOML types alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let batch = self.simulation.batch_size;
        if self.simulation.interval_secs > 0 && !(1..=MAX_SYNTHETIC_BATCH).contains(&batch) {
            return Err(ConfigError::Invalid {
                key: "simulation.batch_size",
                message: format!("must be between 1 and {MAX_SYNTHETIC_BATCH}, got {batch}"),
            });
        }
        Ok(())
    }
}

fn env_flag(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `FEED_HOST` overrides `server.host`
/// - `FEED_PORT` overrides `server.port`
/// - `FEED_LOG_LEVEL` overrides `logging.level`
/// - `FEED_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `FEED_TOKEN_SECRET` overrides `auth.token_secret`
/// - `FEED_TOKEN_TTL_SECS` overrides `auth.token_ttl_secs`
/// - `FEED_FILES_DIR` overrides `files.dir`
/// - `FEED_SEED_DEMO` overrides `feed.seed_demo_data`
/// - `FEED_SIM_INTERVAL_SECS` overrides `simulation.interval_secs`
/// - `FEED_SIM_BATCH_SIZE` overrides `simulation.batch_size`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if the resulting configuration fails [`Config::validate`].
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Ok(host) = std::env::var("FEED_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("FEED_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("FEED_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("FEED_LOG_JSON") {
        config.logging.json = env_flag(&json);
    }
    if let Ok(secret) = std::env::var("FEED_TOKEN_SECRET") {
        if !secret.is_empty() {
            config.auth.token_secret = Some(secret);
        }
    }
    if let Ok(ttl) = std::env::var("FEED_TOKEN_TTL_SECS") {
        if let Ok(parsed) = ttl.parse() {
            config.auth.token_ttl_secs = parsed;
        }
    }
    if let Ok(dir) = std::env::var("FEED_FILES_DIR") {
        config.files.dir = PathBuf::from(dir);
    }
    if let Ok(seed) = std::env::var("FEED_SEED_DEMO") {
        config.feed.seed_demo_data = env_flag(&seed);
    }
    if let Ok(interval) = std::env::var("FEED_SIM_INTERVAL_SECS") {
        if let Ok(parsed) = interval.parse() {
            config.simulation.interval_secs = parsed;
        }
    }
    if let Ok(batch) = std::env::var("FEED_SIM_BATCH_SIZE") {
        if let Ok(parsed) = batch.parse() {
            config.simulation.batch_size = parsed;
        }
    }

    config.validate()?;
    Ok(config)
}
