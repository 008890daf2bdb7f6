//! Deterministic oracles for `AI_TEST_MODE=mock` and tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use super::{ImageOracle, OracleError, Provider, TextOracle};

/// Good enough for a whole offline run: scores article 1, selects candidate 1,
/// and doubles as post text.
pub const MOCK_RESPONSE: &str = "1: 7.5 - Mock score for offline runs\nSelected: 1\nFinal Reason: mock selection";

/// Simple mock provider for local runs; sits behind `CachingOracle` like a real one.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn with_text(text: &str) -> Self {
        Self {
            fixed: text.to_string(),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::with_text(MOCK_RESPONSE)
    }
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, OracleError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Replays queued responses in order and records every prompt it was given.
/// `None` entries (and an exhausted queue) behave like a failed call.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| r.map(Into::into)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl TextOracle for ScriptedOracle {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .flatten()
            .filter(|s| !s.trim().is_empty());
        Box::pin(async move { next })
    }
    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Always returns the same image bytes.
pub struct StaticImageOracle {
    pub bytes: Vec<u8>,
}

impl ImageOracle for StaticImageOracle {
    fn generate_image<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + 'a>> {
        let out = self.bytes.clone();
        Box::pin(async move { Some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "static"
    }
}
