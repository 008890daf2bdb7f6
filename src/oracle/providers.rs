//! Concrete providers: Gemini (text + image) and OpenAI chat completions (text).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ImageOracle, OracleError, Provider};
use crate::config::ai::AiConfig;

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const BACKOFF_BASE_MS: u64 = 500;

fn http_client(cfg: &AiConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent("post-curator/0.1")
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    Ok(client)
}

/// Run `op` once plus up to `max_retries` more times on transient errors,
/// sleeping 500ms, 1s, 2s, ... between attempts.
async fn with_retries<T, F, Fut>(provider: &str, max_retries: u8, mut op: F) -> Result<T, OracleError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt <= u32::from(max_retries) => {
                let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1).min(6));
                warn!(target: "oracle", provider, attempt, error = %e, "retrying after {:?}", delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiTextPart<'a>>,
}

#[derive(Serialize)]
struct GeminiTextPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
}

#[derive(Deserialize, Default)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiRespContent>,
}

#[derive(Deserialize)]
struct GeminiRespContent {
    #[serde(default)]
    parts: Vec<GeminiRespPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRespPart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    data: String,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &GeminiRespPart> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn first_inline_data(&self) -> Option<&str> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .next()
    }
}

/// Gemini `generateContent` REST client. Cheap to clone.
#[derive(Clone)]
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    text_model: String,
    image_model: String,
    temperature: f32,
    max_retries: u8,
}

impl GeminiProvider {
    pub fn new(api_key: String, cfg: &AiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            http: http_client(cfg)?,
            api_key,
            text_model: cfg.text_model.clone(),
            image_model: cfg.image_model.clone(),
            temperature: cfg.temperature,
            max_retries: cfg.max_retries,
        })
    }

    async fn post(&self, model: &str, req: &GeminiRequest<'_>) -> Result<GeminiResponse, OracleError> {
        let url = format!("{GEMINI_BASE}/models/{model}:generateContent");
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(OracleError::Status(resp.status()));
        }
        Ok(resp.json::<GeminiResponse>().await?)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, OracleError> {
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiTextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                ..GenerationConfig::default()
            },
        };
        let body = with_retries("gemini", self.max_retries, || self.post(&self.text_model, &req)).await?;
        let text = body.text();
        if text.trim().is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(text)
    }

    async fn generate_png(&self, prompt: &str) -> Result<Vec<u8>, OracleError> {
        let req = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiTextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 1.0,
                top_p: Some(0.95),
                max_output_tokens: Some(8192),
                response_modalities: Some(vec!["IMAGE"]),
                image_config: Some(ImageConfig {
                    aspect_ratio: "16:9",
                }),
            },
        };
        let body = with_retries("gemini", self.max_retries, || self.post(&self.image_model, &req)).await?;
        let b64 = body.first_inline_data().ok_or(OracleError::Empty)?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(b64.trim())?;
        if bytes.is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(bytes)
    }
}

impl Provider for GeminiProvider {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(self.generate_text(prompt))
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
    fn model(&self) -> &str {
        &self.text_model
    }
}

impl ImageOracle for GeminiProvider {
    fn generate_image<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            match self.generate_png(prompt).await {
                Ok(bytes) => {
                    tracing::info!(target: "oracle", bytes = bytes.len(), "image generated");
                    Some(bytes)
                }
                Err(e) => {
                    warn!(target: "oracle", provider = "gemini", error = %e, "image generation failed");
                    metrics::counter!("oracle_failures_total", "provider" => "gemini-image")
                        .increment(1);
                    None
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// OpenAI
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API).
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_retries: u8,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatReq<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Uses `text_model` from config unless it names a Gemini model, then gpt-4o-mini.
    pub fn new(api_key: String, cfg: &AiConfig) -> anyhow::Result<Self> {
        let model = if cfg.text_model.starts_with("gemini") {
            "gpt-4o-mini".to_string()
        } else {
            cfg.text_model.clone()
        };
        Ok(Self {
            http: http_client(cfg)?,
            api_key,
            model,
            temperature: cfg.temperature,
            max_retries: cfg.max_retries,
        })
    }

    async fn post(&self, req: &ChatReq<'_>) -> Result<String, OracleError> {
        let resp = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(OracleError::Status(resp.status()));
        }
        let body: ChatResp = resp.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(OracleError::Empty)
    }
}

impl Provider for OpenAiProvider {
    fn fetch<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        Box::pin(async move {
            let req = ChatReq {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: self.temperature,
            };
            with_retries("openai", self.max_retries, || self.post(&req)).await
        })
    }
    fn name(&self) -> &'static str {
        "openai"
    }
    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn gemini_response_joins_text_parts() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"1: 8.0 "},{"text":"- big"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.text(), "1: 8.0 - big");
        assert!(body.first_inline_data().is_none());
    }

    #[test]
    fn gemini_response_finds_inline_image() {
        let body: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"here"},{"inlineData":{"mimeType":"image/png","data":"iVBORw=="}}]}}]}"#,
        )
        .unwrap();
        assert_eq!(body.first_inline_data(), Some("iVBORw=="));
    }

    #[test]
    fn image_request_serializes_camel_case() {
        let req = GeminiRequest {
            contents: vec![],
            generation_config: GenerationConfig {
                temperature: 1.0,
                response_modalities: Some(vec!["IMAGE"]),
                image_config: Some(ImageConfig {
                    aspect_ratio: "16:9",
                }),
                ..GenerationConfig::default()
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["generationConfig"]["responseModalities"][0], "IMAGE");
        assert_eq!(v["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert!(v["generationConfig"].get("topP").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_at_limit_for_transient_errors() {
        let calls = AtomicU32::new(0);
        let out: Result<(), OracleError> = with_retries("test", 2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(OracleError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)) }
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn max_u8_retry_budget_terminates() {
        let calls = AtomicU32::new(0);
        let out: Result<(), OracleError> = with_retries("test", u8::MAX, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(OracleError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE)) }
        })
        .await;
        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 256);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let out: Result<(), OracleError> = with_retries("test", 5, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(OracleError::Empty) }
        })
        .await;
        assert!(matches!(out, Err(OracleError::Empty)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
