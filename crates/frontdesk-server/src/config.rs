//! Server configuration loading from file and environment variables.

use frontdesk_dialogue::{ChatConfig, StrategyKind};
use frontdesk_voice::SpeechConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
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

    /// Speech synthesis and recognition settings.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Dialogue strategy settings.
    #[serde(default)]
    pub dialogue: DialogueConfig,
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
    /// Log level filter (e.g., "info", "debug", "frontdesk_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// How the assistant decides what to say.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogueConfig {
    /// `scripted` (booking script) or `chat` (remote completion backend).
    #[serde(default)]
    pub mode: StrategyKind,

    /// Opening line. Defaults to the strategy's own greeting.
    #[serde(default)]
    pub greeting: Option<String>,

    /// Greet automatically once the server is up.
    #[serde(default = "default_greet_on_start")]
    pub greet_on_start: bool,

    /// Delay before the automatic greeting.
    #[serde(default = "default_greeting_delay_ms")]
    pub greeting_delay_ms: u64,

    /// Upper bound on one backend call, after which the turn fails.
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_greet_on_start() -> bool {
    true
}

fn default_greeting_delay_ms() -> u64 {
    1000
}

fn default_backend_timeout_secs() -> u64 {
    30
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

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            mode: StrategyKind::default(),
            greeting: None,
            greet_on_start: default_greet_on_start(),
            greeting_delay_ms: default_greeting_delay_ms(),
            backend_timeout_secs: default_backend_timeout_secs(),
            chat: ChatConfig::default(),
        }
    }
}

impl DialogueConfig {
    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// The configured greeting, ignoring a blank value.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting
            .as_deref()
            .map(str::trim)
            .filter(|greeting| !greeting.is_empty())
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

    /// A value is outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `FRONTDESK_HOST` overrides `server.host`
/// - `FRONTDESK_PORT` overrides `server.port`
/// - `FRONTDESK_LOG_LEVEL` overrides `logging.level`
/// - `FRONTDESK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `FRONTDESK_DIALOGUE_MODE` overrides `dialogue.mode`
/// - `FRONTDESK_GREETING` overrides `dialogue.greeting`
/// - `FRONTDESK_OPENAI_API_KEY` (or `OPENAI_API_KEY`) overrides
///   `dialogue.chat.api_key`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the speech settings are out of range.
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

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    config
        .speech
        .validate()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

    Ok(config)
}

/// Applies `FRONTDESK_*` overrides read through `lookup`. Unparseable values
/// are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("FRONTDESK_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("FRONTDESK_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(level) = lookup("FRONTDESK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("FRONTDESK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(mode) = lookup("FRONTDESK_DIALOGUE_MODE") {
        if let Ok(parsed) = mode.parse() {
            config.dialogue.mode = parsed;
        }
    }
    if let Some(greeting) = lookup("FRONTDESK_GREETING") {
        config.dialogue.greeting = Some(greeting);
    }
    if let Some(key) = lookup("FRONTDESK_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
        config.dialogue.chat.api_key = Some(key);
    }
}
