//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub flow: FlowConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Transcript store location and tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file. `:memory:` keeps transcripts in
    /// process memory only.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Call-flow settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowConfig {
    /// Public base URL the provider reaches this service on. Gather targets
    /// are built as `<base_url><routing key>`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whether `/voice` first asks the caller to press a key before the
    /// welcome prompt. When false, `/voice` gathers the concern directly.
    #[serde(default = "default_keypad_gate")]
    pub keypad_gate: bool,
}

/// Voice used for every spoken line.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_name")]
    pub name: String,

    #[serde(default = "default_voice_language")]
    pub language: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "careline_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "careline.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    careline_db::DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    careline_db::DbRuntimeSettings::default().pool_max_size
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_keypad_gate() -> bool {
    true
}

fn default_voice_name() -> String {
    careline_twiml::VoiceSettings::default().name
}

fn default_voice_language() -> String {
    careline_twiml::VoiceSettings::default().language
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl DatabaseConfig {
    pub fn runtime_settings(&self) -> careline_db::DbRuntimeSettings {
        careline_db::DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            keypad_gate: default_keypad_gate(),
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: default_voice_name(),
            language: default_voice_language(),
        }
    }
}

impl From<&VoiceConfig> for careline_twiml::VoiceSettings {
    fn from(voice: &VoiceConfig) -> Self {
        Self {
            name: voice.name.clone(),
            language: voice.language.clone(),
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

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `CARELINE_HOST` overrides `server.host`
/// - `CARELINE_PORT` overrides `server.port`
/// - `CARELINE_DB_PATH` overrides `database.path`
/// - `CARELINE_BASE_URL` overrides `flow.base_url`
/// - `CARELINE_KEYPAD_GATE` overrides `flow.keypad_gate` ("true"/"1" or "false"/"0")
/// - `CARELINE_VOICE` overrides `voice.name`
/// - `CARELINE_LANGUAGE` overrides `voice.language`
/// - `CARELINE_LOG_LEVEL` overrides `logging.level`
/// - `CARELINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
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

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Applies `CARELINE_*` overrides read through `lookup`.
///
/// Unparseable host, port and flag values are ignored.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("CARELINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("CARELINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("CARELINE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(base_url) = lookup("CARELINE_BASE_URL") {
        config.flow.base_url = base_url;
    }
    if let Some(gate) = lookup("CARELINE_KEYPAD_GATE") {
        match gate.as_str() {
            "true" | "1" => config.flow.keypad_gate = true,
            "false" | "0" => config.flow.keypad_gate = false,
            _ => {}
        }
    }
    if let Some(voice) = lookup("CARELINE_VOICE") {
        config.voice.name = voice;
    }
    if let Some(language) = lookup("CARELINE_LANGUAGE") {
        config.voice.language = language;
    }
    if let Some(level) = lookup("CARELINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("CARELINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
