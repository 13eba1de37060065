//! Analyzer configuration persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::{GenerationParams, DEFAULT_GEMINI_BASE_URL};

/// Models tried for document analysis, best first.
pub const ANALYSIS_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-1.5-flash", "gemini-1.5-pro"];
/// Models tried by the chat assistant, best first.
pub const CHAT_MODELS: &[&str] = &[
    "gemini-2.0-flash-exp",
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-pro",
];
pub const RISK_MODEL: &str = "gemini-2.0-flash-exp";

pub const DEFAULT_TRUNCATE_CHARS: usize = 50_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHAT_MIN_INTERVAL_MS: u64 = 1500;

/// Stored analyzer configuration (persisted to analyzer-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_analysis_models")]
    pub analysis_models: Vec<String>,
    #[serde(default = "default_chat_models")]
    pub chat_models: Vec<String>,
    #[serde(default = "default_risk_models")]
    pub risk_models: Vec<String>,
    /// Document text beyond this many characters is cut before prompting.
    #[serde(default = "default_truncate_chars")]
    pub truncate_chars: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Minimum gap between chat calls.
    #[serde(default = "default_chat_min_interval_ms")]
    pub chat_min_interval_ms: u64,
    #[serde(default = "default_analysis_params")]
    pub analysis_params: GenerationParams,
    #[serde(default = "default_risk_params")]
    pub risk_params: GenerationParams,
    #[serde(default = "default_chat_params")]
    pub chat_params: GenerationParams,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.into()
}
fn default_analysis_models() -> Vec<String> {
    ANALYSIS_MODELS.iter().map(|s| s.to_string()).collect()
}
fn default_chat_models() -> Vec<String> {
    CHAT_MODELS.iter().map(|s| s.to_string()).collect()
}
fn default_risk_models() -> Vec<String> {
    vec![RISK_MODEL.into()]
}
fn default_truncate_chars() -> usize {
    DEFAULT_TRUNCATE_CHARS
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_chat_min_interval_ms() -> u64 {
    DEFAULT_CHAT_MIN_INTERVAL_MS
}
fn default_analysis_params() -> GenerationParams {
    GenerationParams::ANALYSIS
}
fn default_risk_params() -> GenerationParams {
    GenerationParams::RISK
}
fn default_chat_params() -> GenerationParams {
    GenerationParams::CHAT
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            analysis_models: default_analysis_models(),
            chat_models: default_chat_models(),
            risk_models: default_risk_models(),
            truncate_chars: DEFAULT_TRUNCATE_CHARS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            chat_min_interval_ms: DEFAULT_CHAT_MIN_INTERVAL_MS,
            analysis_params: GenerationParams::ANALYSIS,
            risk_params: GenerationParams::RISK,
            chat_params: GenerationParams::CHAT,
            config_path: PathBuf::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: AnalyzerConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        if config.api_key.is_none() {
            config.api_key = std::env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = url;
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved analyzer config to {}", self.config_path.display());
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn chat_min_interval(&self) -> Duration {
        Duration::from_millis(self.chat_min_interval_ms)
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
