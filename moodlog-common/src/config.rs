//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration lives in a TOML file. Resolution priority for every
//! setting that can be overridden:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file never prevents startup: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data root folder
pub const ROOT_FOLDER_ENV: &str = "MOODLOG_ROOT_FOLDER";
/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "MOODLOG_CONFIG";
/// Environment variable carrying the sentiment provider API key
pub const SENTIMENT_API_KEY_ENV: &str = "MOODLOG_SENTIMENT_API_KEY";
/// Environment variable carrying the emotion provider API key
pub const EMOTION_API_KEY_ENV: &str = "MOODLOG_EMOTION_API_KEY";

const DATABASE_FILE_NAME: &str = "moodlog.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data root folder (database lives here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub sentiment: SentimentConfig,

    #[serde(default)]
    pub emotion: EmotionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Retry settings applied to every remote call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each failed retry
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Text sentiment provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Analysis endpoint receiving `{"text": ...}`
    #[serde(default = "default_sentiment_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sentiment_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Video emotion provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionConfig {
    /// Batch API base URL (jobs live under `{base_url}/batch/jobs`)
    #[serde(default = "default_emotion_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Modalities requested on job submission
    #[serde(default = "default_emotion_models")]
    pub models: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            base_url: default_emotion_base_url(),
            api_key: None,
            models: default_emotion_models(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_attempts() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sentiment_endpoint() -> String {
    "http://127.0.0.1:8600/v1/sentiment".to_string()
}

fn default_emotion_base_url() -> String {
    "https://api.hume.ai/v0".to_string()
}

fn default_emotion_models() -> Vec<String> {
    vec!["face".to_string(), "prosody".to_string()]
}

/// Root folder resolution
///
/// Priority: CLI argument → `MOODLOG_ROOT_FOLDER` → TOML `root_folder` → OS default.
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("moodlog"))
        .unwrap_or_else(|| PathBuf::from("./moodlog_data"))
}

/// Database file inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}

/// Config file location
///
/// Priority: CLI argument → `MOODLOG_CONFIG` → `{config_dir}/moodlog/config.toml`.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("moodlog").join("config.toml"))
}

/// Load TOML config, falling back to defaults when the file is missing
///
/// A file that exists but fails to parse is an error: silently ignoring a
/// broken config would hide misconfigured API keys.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}; using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
///
/// The file may hold API keys, so on Unix it is restricted to 0600.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolve a provider API key
///
/// **Priority:** ENV → TOML. Whitespace-only values are treated as absent.
pub fn resolve_api_key(
    service: &str,
    env_var: &str,
    toml_value: Option<&String>,
) -> Result<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML. Using environment (highest priority).",
            service
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", service);
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", service);
        return Ok(key.clone());
    }

    Err(Error::Config(format!(
        "{service} API key not configured. Please configure using one of:\n\
         1. Environment: {env_var}=your-key-here\n\
         2. TOML config: api_key = \"your-key\" in the [{section}] section",
        service = service,
        env_var = env_var,
        section = service.to_lowercase(),
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
