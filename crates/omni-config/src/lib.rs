use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use omni_types::Mode;

/// Environment variable holding the Gemini credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("No API key configured: pass --api-key, set GEMINI_API_KEY, or add api_key to the config file")]
    MissingCredential,
}

/// Model names used per media kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_image_model")]
    pub image: String,
    #[serde(default = "default_video_model")]
    pub video: String,
}

fn default_image_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_video_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            image: default_image_model(),
            video: default_video_model(),
        }
    }
}

/// Bounds for the uploaded-video status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between status queries.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Maximum number of status queries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wall-clock limit for the whole poll, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    2
}

fn default_max_attempts() -> u32 {
    300
}

fn default_timeout_secs() -> u64 {
    600
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Which hosted text-to-speech endpoint to call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    #[default]
    Google,
    Openai,
}

/// Spoken report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default)]
    pub provider: SpeechProvider,
    /// Language code for the synthesized voice.
    #[serde(default = "default_language")]
    pub language: String,
    /// Directory the report clip is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Base URL of the Google Translate speech endpoint.
    #[serde(default = "default_speech_base_url")]
    pub base_url: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_speech_base_url() -> String {
    "https://translate.google.com".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            language: default_language(),
            output_dir: default_output_dir(),
            base_url: default_speech_base_url(),
        }
    }
}

/// Top-level omni-analyst configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OmniConfig {
    /// Gemini API key (lowest precedence source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Default reasoning mode.
    #[serde(default)]
    pub mode: Mode,
    /// Whether to produce the spoken report.
    #[serde(default = "default_true")]
    pub audio_enabled: bool,
    /// Base URL of the inference API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

impl Default for OmniConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            mode: Mode::default(),
            audio_enabled: true,
            api_base_url: default_api_base_url(),
            models: ModelsConfig::default(),
            poll: PollConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

/// Resolve the omni-analyst config directory (~/.omni-analyst/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".omni-analyst"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.omni-analyst/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from `path` (or the default path), falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<OmniConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    match path {
        Some(path) => load_config_from(path),
        None => load_config_from(&config_file_path()?),
    }
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<OmniConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(OmniConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: OmniConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Resolve the credential: flag > `GEMINI_API_KEY` (passed as `env`) > config
/// file. Blank values count as absent.
pub fn resolve_api_key_from(
    flag: Option<&str>,
    env: Option<&str>,
    config: &OmniConfig,
) -> Result<String, ConfigError> {
    [flag, env, config.api_key.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|k| !k.is_empty())
        .map(String::from)
        .ok_or(ConfigError::MissingCredential)
}
