// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One feed entry. Identity is structural: dedup and re-identification use the title only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub title: String,
    pub summary: String, // may be truncated upstream
    pub url: String,
    pub source: String,       // feed display name, e.g. "DeepMind Blog"
    pub date: Option<String>, // RFC 3339 when the feed date parsed, raw otherwise
    /// Relevance score (0..=10) attached by the ranker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// One-line reason the scorer gave for `score`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            url: url.into(),
            source: source.into(),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Article>>;
    fn name(&self) -> &str;
}
