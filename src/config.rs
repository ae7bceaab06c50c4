//! Configuration system for Nexus Hub
//!
//! Sources, highest precedence first: `NEXUS_*` environment variables,
//! the TOML file (`--config`, `./nexus-hub.toml`, the platform config dir,
//! then `~/.nexus/hub.toml`), and built-in defaults. CLI flags such as
//! `-v` or `watch --interval-ms` are applied by the caller on top.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "nexus-hub.toml";

/// Main hub configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Where profile records live
    pub storage: StorageSettings,

    /// Cross-view synchronization
    pub sync: SyncSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Generative assistant
    pub assistant: AssistantSettings,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory holding one JSON file per record
    pub data_dir: String,
}

/// Sync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Reconciliation poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Change notifications buffered per subscriber before it lags
    pub bus_capacity: usize,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Which assistant implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantProvider {
    /// Deterministic, no network
    #[default]
    Offline,
    /// OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi,
}

/// Assistant settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// Enable assistant features
    pub enabled: bool,

    pub provider: AssistantProvider,

    /// API base URL (e.g., "https://api.openai.com/v1", "http://localhost:11434/v1")
    pub base_url: String,

    /// API key (empty string for local servers like Ollama)
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,
}

// Default implementations

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.nexus/hub".to_string(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            bus_capacity: 64,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: AssistantProvider::Offline,
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: String::new(),
            model: "llama3".to_string(),
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Upper bound for `assistant.max_retries`.
pub const MAX_ASSISTANT_RETRIES: u32 = 10;

/// Longest single pause between assistant retries.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(30);

impl AssistantSettings {
    /// Pause before retry number `retry` (1-based): 500ms doubling, capped.
    pub fn retry_backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.checked_pow(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(500u64.saturating_mul(factor)).min(MAX_RETRY_BACKOFF)
    }

    /// Sum of every pause a call with all retries would sleep.
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_retries).map(|retry| self.retry_backoff(retry)).sum()
    }
}

impl HubConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            config = Self::from_file(&path)?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Parse a configuration file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        // If explicit path provided, use it (error if not found)
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::config_not_found(path));
        }

        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            dirs::config_dir()
                .map(|p| p.join("nexus").join("hub.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".nexus").join("hub.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply `NEXUS_*` environment overrides. Values that fail to parse
    /// are ignored and the file value stays.
    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env_string("NEXUS_DATA_DIR") {
            self.storage.data_dir = dir;
        }

        if let Some(ms) = env_parse("NEXUS_POLL_INTERVAL_MS") {
            self.sync.poll_interval_ms = ms;
        }
        if let Some(capacity) = env_parse("NEXUS_BUS_CAPACITY") {
            self.sync.bus_capacity = capacity;
        }

        if let Some(level) = env_string("NEXUS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = env_string("NEXUS_LOG_FILE") {
            self.logging.file = Some(file);
        }
        if let Some(json) = env_string("NEXUS_LOG_JSON") {
            self.logging.json_format = parse_bool(&json);
        }

        let assistant = &mut self.assistant;
        if let Some(enabled) = env_string("NEXUS_ASSISTANT_ENABLED") {
            assistant.enabled = parse_bool(&enabled);
        }
        if let Some(provider) = env_string("NEXUS_ASSISTANT_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "offline" => assistant.provider = AssistantProvider::Offline,
                "openai" => assistant.provider = AssistantProvider::OpenAi,
                other => debug!(value = other, "Ignoring unknown NEXUS_ASSISTANT_PROVIDER"),
            }
        }
        if let Some(url) = env_string("NEXUS_ASSISTANT_BASE_URL") {
            assistant.base_url = url;
        }
        if let Some(key) = env_string("NEXUS_ASSISTANT_API_KEY") {
            assistant.api_key = key;
        }
        if let Some(model) = env_string("NEXUS_ASSISTANT_MODEL") {
            assistant.model = model;
        }
        if let Some(secs) = env_parse("NEXUS_ASSISTANT_TIMEOUT_SECS") {
            assistant.timeout_secs = secs;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(Error::config_field_invalid("storage.data_dir", "data_dir cannot be empty"));
        }

        if self.sync.poll_interval_ms == 0 {
            return Err(Error::config_field_invalid(
                "sync.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }
        if self.sync.bus_capacity == 0 {
            return Err(Error::config_field_invalid(
                "sync.bus_capacity",
                "bus_capacity must be greater than 0",
            ));
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if self.assistant.provider == AssistantProvider::OpenAi {
            let url = &self.assistant.base_url;
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::config_field_invalid(
                    "assistant.base_url",
                    "base_url must start with http:// or https://",
                ));
            }
        }
        if self.assistant.timeout_secs == 0 {
            return Err(Error::config_field_invalid(
                "assistant.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
        if self.assistant.max_retries > MAX_ASSISTANT_RETRIES {
            return Err(Error::config_field_invalid(
                "assistant.max_retries",
                format!("max_retries must be at most {}", MAX_ASSISTANT_RETRIES),
            ));
        }

        Ok(())
    }

    /// Get the data directory as a PathBuf
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.sync.poll_interval_ms)
    }

    /// Deadline for one guarded assistant call, retries and their pauses
    /// included
    pub fn assistant_deadline(&self) -> Duration {
        let attempts = u64::from(self.assistant.max_retries) + 1;
        Duration::from_secs(self.assistant.timeout_secs.saturating_mul(attempts))
            .saturating_add(self.assistant.total_backoff())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            debug!(name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

fn parse_bool(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location written by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nexus")
        .join("hub.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    // Check if file exists
    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    // Create parent directories
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    info!(path = %config_path.display(), "Configuration file created");
    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# Nexus Hub Configuration

[storage]
# Directory holding the profile records (one JSON file per record)
data_dir = "~/.nexus/hub"

[sync]
# How often open views re-read the stored profile (milliseconds)
poll_interval_ms = 1000

# Change notifications buffered per view before it falls back to a full reload
bus_capacity = 64

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.nexus/logs/hub.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[assistant]
# Enable assistant features
enabled = true

# "offline" (deterministic, no network) or "openai" (any OpenAI-compatible server)
provider = "offline"

# API base URL (OpenAI, Ollama, vLLM, LM Studio, etc.)
base_url = "http://localhost:11434/v1"

# API key (leave empty for local servers like Ollama)
api_key = ""

# Model identifier
model = "llama3"

# Request timeout in seconds
timeout_secs = 60

# Maximum retries on transient failures
max_retries = 2
"#
    .to_string()
}
