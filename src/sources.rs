//! Credible-source extraction for post citations.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ingest::types::Article;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct SourceValidator {
    credible_domains: Vec<String>,
}

impl SourceValidator {
    pub fn new(credible_domains: Vec<String>) -> Self {
        info!(count = credible_domains.len(), "loaded credible domains");
        Self { credible_domains }
    }

    /// True when the URL's host contains one of the credible domains.
    pub fn is_credible(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.credible_domains
            .iter()
            .any(|d| host.contains(d.as_str()))
    }

    /// First `num_sources` credible articles as citations, in input order.
    pub fn extract_sources(&self, articles: &[Article], num_sources: usize) -> Vec<Source> {
        let out: Vec<Source> = articles
            .iter()
            .filter(|a| self.is_credible(&a.url))
            .take(num_sources)
            .map(|a| Source {
                title: if a.title.is_empty() {
                    "Untitled".to_string()
                } else {
                    a.title.clone()
                },
                url: a.url.clone(),
            })
            .collect();
        info!(count = out.len(), "extracted credible sources");
        out
    }
}
