//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::connection::{BackoffPolicy, ConnectionConfig};
use crate::monitor::MonitorConfig;
use crate::relay::{DetectionPolicyConfig, RelayConfig as RelayServerConfig};
#[cfg(not(target_os = "linux"))]
use crate::speech::TtsEngine;
use crate::speech::{CommandEngine, SilentEngine, SpeechEngine};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Alert monitor connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_ws_url")]
    pub url: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_ws_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_ws_url(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

/// Speech synthesis settings
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub engine: SpeechBackend,

    /// Synthesizer program; the text is passed as its last argument
    #[serde(default = "default_speech_command")]
    pub command: String,

    /// Extra arguments; defaults to `-s <rate>` for espeak
    #[serde(default)]
    pub args: Option<Vec<String>>,

    /// Words per minute
    #[serde(default = "default_speech_rate")]
    pub rate: u32,
}

fn default_speech_enabled() -> bool {
    true
}

fn default_speech_command() -> String {
    "espeak".to_string()
}

fn default_speech_rate() -> u32 {
    150
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            engine: SpeechBackend::default(),
            command: default_speech_command(),
            args: None,
            rate: default_speech_rate(),
        }
    }
}

/// Which synthesizer reads alerts aloud
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Native on macOS and Windows, the command on Linux
    #[default]
    Auto,
    /// Operating system synthesizer through the `tts` crate
    Native,
    /// External program from `speech.command`
    Command,
}

impl SpeechBackend {
    /// Resolve `Auto` for the current platform
    pub fn resolve(self) -> Self {
        match self {
            SpeechBackend::Auto if cfg!(target_os = "linux") => SpeechBackend::Command,
            SpeechBackend::Auto => SpeechBackend::Native,
            other => other,
        }
    }
}

/// Relay server settings
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Seconds before the same class may alert again on the same side
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: i64,

    /// Bounding boxes smaller than this (in px²) are too far away to alert
    #[serde(default = "default_min_box_area")]
    pub min_box_area: i64,

    #[serde(default = "default_alert_classes")]
    pub alert_classes: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_connections() -> usize {
    100
}

fn default_cooldown() -> i64 {
    120
}

fn default_min_box_area() -> i64 {
    5000
}

fn default_alert_classes() -> Vec<String> {
    vec!["person".to_string(), "dog".to_string(), "car".to_string()]
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            cooldown_secs: default_cooldown(),
            min_box_area: default_min_box_area(),
            alert_classes: default_alert_classes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load an explicit file, or fall back to the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("beetleguard").join("config.toml")),
            Some(PathBuf::from("/etc/beetleguard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Client overrides
        if let Some(url) = lookup("BEETLEGUARD_WS_URL") {
            self.client.url = url;
        }
        if let Some(retries) = lookup("BEETLEGUARD_MAX_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.client.max_retries = r;
            }
        }

        // Speech overrides
        if let Some(enabled) = lookup("BEETLEGUARD_SPEECH_ENABLED") {
            if let Ok(e) = enabled.parse() {
                self.speech.enabled = e;
            }
        }

        // Relay overrides
        if let Some(host) = lookup("BEETLEGUARD_RELAY_HOST") {
            self.relay.host = host;
        }
        if let Some(port) = lookup("BEETLEGUARD_RELAY_PORT") {
            if let Ok(p) = port.parse() {
                self.relay.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = lookup("BEETLEGUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("BEETLEGUARD_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Connection manager settings
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.client.url.clone(),
            backoff: BackoffPolicy::new(
                self.client.max_retries,
                Duration::from_millis(self.client.base_delay_ms),
                Duration::from_millis(self.client.max_delay_ms),
            ),
            ..ConnectionConfig::default()
        }
    }

    /// Alert monitor settings
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            connection: self.connection_config(),
        }
    }

    /// Speech engine selected by the `[speech]` section
    pub fn speech_engine(&self) -> Arc<dyn SpeechEngine> {
        if !self.speech.enabled {
            return Arc::new(SilentEngine);
        }
        match self.speech.engine.resolve() {
            SpeechBackend::Native => self.native_engine(),
            _ => Arc::new(self.command_engine()),
        }
    }

    fn command_engine(&self) -> CommandEngine {
        let args = self
            .speech
            .args
            .clone()
            .unwrap_or_else(|| vec!["-s".to_string(), self.speech.rate.to_string()]);
        CommandEngine::new(self.speech.command.clone(), args)
    }

    #[cfg(not(target_os = "linux"))]
    fn native_engine(&self) -> Arc<dyn SpeechEngine> {
        match TtsEngine::new(self.speech.rate) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                tracing::warn!(error = %e, command = %self.speech.command, "Native speech unavailable, using command");
                Arc::new(self.command_engine())
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn native_engine(&self) -> Arc<dyn SpeechEngine> {
        tracing::warn!(command = %self.speech.command, "Native speech is not built on Linux, using command");
        Arc::new(self.command_engine())
    }

    /// Relay server settings
    pub fn relay_config(&self) -> RelayServerConfig {
        RelayServerConfig {
            host: self.relay.host.clone(),
            port: self.relay.port,
            max_connections: self.relay.max_connections,
            detection: DetectionPolicyConfig {
                alert_classes: self.relay.alert_classes.clone(),
                min_box_area: self.relay.min_box_area,
                cooldown_secs: self.relay.cooldown_secs,
            },
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# BeetleGuard Configuration
#
# Environment variables override these settings:
# - BEETLEGUARD_WS_URL
# - BEETLEGUARD_MAX_RETRIES
# - BEETLEGUARD_SPEECH_ENABLED
# - BEETLEGUARD_RELAY_HOST
# - BEETLEGUARD_RELAY_PORT
# - BEETLEGUARD_LOG_LEVEL
# - BEETLEGUARD_LOG_FORMAT

[client]
# Relay WebSocket endpoint
url = "ws://localhost:8000/ws"

# Automatic reconnects before asking for a manual retry
max_retries = 5

# Reconnect delay: min(base_delay_ms * 2^retry, max_delay_ms)
base_delay_ms = 1000
max_delay_ms = 10000

[speech]
# Read alerts aloud
enabled = true

# auto (native on macOS/Windows, command on Linux), native or command
engine = "auto"

# Synthesizer program; the alert text is passed as the last argument
command = "espeak"

# Words per minute (used when args is not set)
rate = 150

# Explicit synthesizer arguments
# args = ["-s", "150", "-v", "en-us"]

[relay]
# Relay server host
host = "0.0.0.0"

# Relay server port
port = 8000

# Maximum concurrent WebSocket clients
max_connections = 100

# Seconds before the same class may alert again on the same side
cooldown_secs = 120

# Minimum bounding box area (px²) for a detection to count as close
min_box_area = 5000

# Detector classes that raise alerts
alert_classes = ["person", "dog", "car"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.client.url, "ws://localhost:8000/ws");
        assert_eq!(config.client.max_retries, 5);
        assert_eq!(config.speech.engine, SpeechBackend::Auto);
        assert_eq!(config.relay.port, 8000);
        assert_eq!(config.relay.cooldown_secs, 120);
        assert_eq!(config.relay.min_box_area, 5000);
        assert_eq!(config.speech.rate, 150);
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.client.url, defaults.client.url);
        assert_eq!(config.client.max_delay_ms, defaults.client.max_delay_ms);
        assert_eq!(config.relay.alert_classes, defaults.relay.alert_classes);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[client]\nurl = \"ws://10.0.0.5:9000/ws\"\nmax_retries = 2\n\n[speech]\nenabled = false"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.client.url, "ws://10.0.0.5:9000/ws");
        assert_eq!(config.client.max_retries, 2);
        assert_eq!(config.client.base_delay_ms, 1000);
        assert!(!config.speech.enabled);
        assert_eq!(config.relay.port, 8000);
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client\nurl = ").unwrap();
        let broken = Config::load(file.path());
        assert!(matches!(broken, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BEETLEGUARD_WS_URL", "ws://relay:8000/ws"),
            ("BEETLEGUARD_MAX_RETRIES", "9"),
            ("BEETLEGUARD_SPEECH_ENABLED", "false"),
            ("BEETLEGUARD_RELAY_PORT", "not-a-port"),
            ("BEETLEGUARD_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.client.url, "ws://relay:8000/ws");
        assert_eq!(config.client.max_retries, 9);
        assert!(!config.speech.enabled);
        assert_eq!(config.relay.port, 8000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_connection_config_mapping() {
        let mut config = Config::default();
        config.client.max_retries = 3;
        config.client.base_delay_ms = 500;
        config.client.max_delay_ms = 2000;

        let connection = config.connection_config();
        assert_eq!(connection.backoff.delay_for(0), Some(Duration::from_millis(500)));
        assert_eq!(connection.backoff.delay_for(2), Some(Duration::from_millis(2000)));
        assert_eq!(connection.backoff.delay_for(3), None);
    }

    #[test]
    fn test_speech_engine_selection() {
        let mut config = Config::default();
        config.speech.engine = SpeechBackend::Command;
        assert_eq!(config.speech_engine().name(), "espeak");

        config.speech.enabled = false;
        assert_eq!(config.speech_engine().name(), "silent");
    }

    #[test]
    fn test_auto_backend_per_platform() {
        let expected = if cfg!(target_os = "linux") {
            SpeechBackend::Command
        } else {
            SpeechBackend::Native
        };
        assert_eq!(SpeechBackend::Auto.resolve(), expected);
        assert_eq!(SpeechBackend::Native.resolve(), SpeechBackend::Native);
        assert_eq!(SpeechBackend::Command.resolve(), SpeechBackend::Command);
    }

    #[test]
    fn test_speech_backend_from_file() {
        let config: Config = toml::from_str("[speech]\nengine = \"native\"").unwrap();
        assert_eq!(config.speech.engine, SpeechBackend::Native);

        let broken = toml::from_str::<Config>("[speech]\nengine = \"festival\"");
        assert!(broken.is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_native_falls_back_to_command_on_linux() {
        let mut config = Config::default();
        config.speech.engine = SpeechBackend::Native;
        assert_eq!(config.speech_engine().name(), "espeak");
    }

    #[test]
    fn test_relay_config_mapping() {
        let config = Config::default();
        let relay = config.relay_config();
        assert_eq!(relay.addr(), "0.0.0.0:8000");
        assert_eq!(relay.detection.cooldown_secs, 120);
    }
}
