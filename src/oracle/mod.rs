//! Oracle adapter: text/image generation behind narrow traits, plus a file cache
//! and daily limit for text calls.
//!
//! Failures never cross the `TextOracle`/`ImageOracle` boundary: providers report
//! `OracleError`, the boundary logs it and yields `None`.

pub mod cache;
pub mod mock;
pub mod providers;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ai::AiConfig;

pub use cache::CachingOracle;
pub use providers::{GeminiProvider, OpenAiProvider};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Text generation: `None` means the call failed or produced no usable text.
pub trait TextOracle: Send + Sync {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Image generation: raw encoded image bytes (PNG/JPEG) or `None`.
pub trait ImageOracle: Send + Sync {
    fn generate_image<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynTextOracle = Arc<dyn TextOracle>;
pub type DynImageOracle = Arc<dyn ImageOracle>;

/// Low-level provider: does a *real* remote call. Separated so the same
/// caching wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>>;
    fn name(&self) -> &'static str;
    /// Model identifier; scopes cached replies together with `name`.
    fn model(&self) -> &str {
        ""
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Transport failure, including request timeout
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the provider
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),

    /// Response parsed but carried no text/image
    #[error("provider returned no content")]
    Empty,

    /// Inline image payload was not valid base64
    #[error("image payload could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("daily limit of {0} calls reached")]
    DailyLimit(u32),
}

impl OracleError {
    /// Worth another attempt: transport errors, 429 and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            OracleError::Http(_) => true,
            OracleError::Status(s) => s.as_u16() == 429 || s.is_server_error(),
            _ => false,
        }
    }
}

// ------------------------------------------------------------
// Factory
// ------------------------------------------------------------

/// Build text + image oracles according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock text oracle and no images.
/// * Else if `config.enabled == false`, returns disabled oracles.
/// * Else builds the configured provider; text calls are wrapped with caching + daily limit.
pub fn build_oracles(config: &AiConfig) -> anyhow::Result<(DynTextOracle, DynImageOracle)> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let text = CachingOracle::new(
            mock::MockProvider::default(),
            config.cache_dir.clone(),
            config.daily_limit,
        );
        return Ok((Arc::new(text), Arc::new(DisabledOracle)));
    }

    if !config.enabled {
        return Ok((Arc::new(DisabledOracle), Arc::new(DisabledOracle)));
    }

    let api_key = config.resolve_api_key()?;
    match config.provider.as_str() {
        "gemini" => {
            let gemini = GeminiProvider::new(api_key, config)?;
            let text = CachingOracle::new(
                gemini.clone(),
                config.cache_dir.clone(),
                config.daily_limit,
            );
            Ok((Arc::new(text), Arc::new(gemini)))
        }
        "openai" => {
            let openai = OpenAiProvider::new(api_key, config)?;
            let text = CachingOracle::new(openai, config.cache_dir.clone(), config.daily_limit);
            Ok((Arc::new(text), Arc::new(DisabledOracle)))
        }
        other => anyhow::bail!("Unsupported provider in config: {other}"),
    }
}

/// Returns `None` always; used when AI is disabled.
pub struct DisabledOracle;

impl TextOracle for DisabledOracle {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

impl ImageOracle for DisabledOracle {
    fn generate_image<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OracleError::Status(reqwest::StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(OracleError::Status(reqwest::StatusCode::BAD_GATEWAY).is_transient());
        assert!(!OracleError::Status(reqwest::StatusCode::UNAUTHORIZED).is_transient());
        assert!(!OracleError::Empty.is_transient());
        assert!(!OracleError::DailyLimit(3).is_transient());
    }

    #[tokio::test]
    async fn disabled_oracle_yields_nothing() {
        assert!(TextOracle::generate(&DisabledOracle, "hi").await.is_none());
        assert!(DisabledOracle.generate_image("hi").await.is_none());
    }

    #[test]
    fn disabled_config_builds_without_api_key() {
        let cfg = AiConfig {
            enabled: false,
            ..AiConfig::default()
        };
        let (text, image) = build_oracles(&cfg).unwrap();
        assert_eq!(text.provider_name(), "disabled");
        assert_eq!(image.provider_name(), "disabled");
    }
}
