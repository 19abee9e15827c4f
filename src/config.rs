//! Configuration for the pairwise judge.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{JudgeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default model used for judgments.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Prompts at or above this many characters are never sent.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 24576;

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API keys, rotated through when one gets rate limited
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Model name (e.g., "gpt-4", "gpt-3.5-turbo-1106")
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_keys: Vec::new(),
            model: default_model(),
        }
    }
}

/// Evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Maximum rendered prompt length in characters (exclusive).
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Directory that receives `pairwise_report_<timestamp>.jsonl` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_max_prompt_chars() -> usize {
    DEFAULT_MAX_PROMPT_CHARS
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
            output_dir: default_output_dir(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Evaluator settings
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEYS, LLM_API_KEY, LLM_MODEL,
    ///    JUDGE_MAX_PROMPT_CHARS, JUDGE_OUTPUT_DIR)
    /// 2. Config file (~/.config/pairwise-judge/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env(|name| env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Some(keys) = var("LLM_API_KEYS") {
            self.llm.api_keys = split_keys(&keys);
        }

        if let Some(key) = var("LLM_API_KEY") {
            let key = key.trim().to_string();
            if !key.is_empty() && !self.llm.api_keys.contains(&key) {
                self.llm.api_keys.push(key);
            }
        }

        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(max_chars) = var("JUDGE_MAX_PROMPT_CHARS") {
            match max_chars.parse() {
                Ok(max_chars) => self.evaluator.max_prompt_chars = max_chars,
                Err(_) => warn!(
                    value = %max_chars,
                    "ignoring JUDGE_MAX_PROMPT_CHARS: not a positive integer"
                ),
            }
        }

        if let Some(output_dir) = var("JUDGE_OUTPUT_DIR") {
            self.evaluator.output_dir = PathBuf::from(output_dir);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| JudgeError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| JudgeError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "pairwise-judge")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(JudgeError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_keys.iter().all(|k| k.trim().is_empty()) {
            return Err(JudgeError::Config(
                "At least one LLM API key is required. Set LLM_API_KEYS (comma-separated) or add api_keys to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(JudgeError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.evaluator.max_prompt_chars == 0 {
            return Err(JudgeError::Config(
                "max_prompt_chars must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm<I, K>(api_base: impl Into<String>, api_keys: I, model: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_keys: api_keys.into_iter().map(Into::into).collect(),
                model: model.into(),
            },
            evaluator: EvaluatorConfig::default(),
        }
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
