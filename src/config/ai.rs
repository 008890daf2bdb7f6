// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
/// Upper bound for `max_retries`; larger configured values are clamped.
pub const MAX_RETRIES_CAP: u8 = 10;

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_text_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u8 {
    2
}
fn default_daily_limit() -> u32 {
    50
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive). Images are Gemini-only.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-request timeout; a timed-out call counts as a failed call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after the first one, with exponential backoff.
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Real (non-cached) text calls allowed per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            api_key: default_api_key(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            daily_limit: default_daily_limit(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        Ok(cfg.sanitized())
    }

    /// $AI_CONFIG_PATH, then `config/ai.json`, then built-in defaults.
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            return Self::load_from_file(p);
        }
        let p = PathBuf::from(DEFAULT_AI_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        self.max_retries = self.max_retries.min(MAX_RETRIES_CAP);
        self
    }

    /// Resolve the API key, reading the provider's env var when configured as "ENV".
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return Ok(self.api_key.trim().to_string());
        }
        let var = match self.provider.as_str() {
            "gemini" => "GEMINI_API_KEY",
            "openai" => "OPENAI_API_KEY",
            other => anyhow::bail!("Unsupported provider in config: {other}"),
        };
        let key = env::var(var).map_err(|_| anyhow::anyhow!("Missing {var} env var"))?;
        if key.trim().is_empty() || key == "your_gemini_api_key_here" {
            anyhow::bail!("{var} is set but empty or a placeholder");
        }
        Ok(key)
    }
}
