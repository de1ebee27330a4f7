//! Configuration for the chat collaborator

use super::Turn;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set (or set LLM_GATEWAY)")]
    MissingApiKey,
    #[error("Invalid TURNLINE_PORT: {0}")]
    InvalidPort(String),
    #[error("Failed to read seed history {path}: {source}")]
    SeedRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse seed history {path}: {source}")]
    SeedParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// Harm categories the service filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(dead_code)] // Full wire enum; only BLOCK_ONLY_HIGH is configured
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Only high-probability harm is blocked, in every category
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::HarmCategoryHarassment,
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryDangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: HarmBlockThreshold::BlockOnlyHigh,
    })
    .collect()
}

/// Configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    /// Gateway URL; when set the gateway handles authentication
    pub gateway: Option<String>,
    pub model: String,
    pub port: u16,
    pub seed_history_path: Option<PathBuf>,
    pub generation: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            gateway: None,
            model: DEFAULT_MODEL.to_string(),
            port: DEFAULT_PORT,
            seed_history_path: None,
            generation: GenerationConfig::default(),
            safety_settings: default_safety_settings(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("TURNLINE_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        let config = Self {
            api_key: non_empty("GEMINI_API_KEY"),
            gateway: non_empty("LLM_GATEWAY"),
            model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            port,
            seed_history_path: non_empty("TURNLINE_SEED_HISTORY").map(PathBuf::from),
            ..Self::default()
        };

        if config.api_key.is_none() && config.gateway.is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(config)
    }

    /// Load the opening turns of the session, if a seed file is configured
    pub fn seed_history(&self) -> Result<Vec<Turn>, ConfigError> {
        match &self.seed_history_path {
            Some(path) => load_seed_history(path),
            None => Ok(Vec::new()),
        }
    }
}

fn load_seed_history(path: &Path) -> Result<Vec<Turn>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::SeedRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::SeedParse {
        path: path.to_path_buf(),
        source,
    })
}
