// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_AGENT_CONFIG_PATH: &str = "config/agent.toml";
pub const ENV_AGENT_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

impl FeedConfig {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig::new(
            "MIT Technology Review AI",
            "https://www.technologyreview.com/topic/artificial-intelligence/feed/",
        ),
        FeedConfig::new("DeepMind Blog", "https://deepmind.google/blog/rss.xml"),
        FeedConfig::new(
            "NVIDIA AI Blog",
            "https://blogs.nvidia.com/blog/category/deep-learning/feed/",
        ),
        FeedConfig::new("Microsoft AI Blog", "https://blogs.microsoft.com/ai/feed/"),
        FeedConfig::new("MarkTechPost AI", "https://www.marktechpost.com/feed/"),
        FeedConfig::new("AI News", "https://www.artificialintelligence-news.com/feed/"),
        FeedConfig::new("Hugging Face Blog", "https://huggingface.co/blog/feed.xml"),
        FeedConfig::new("Papers With Code", "https://paperswithcode.com/newsletter/rss/"),
    ]
}

fn default_credible_domains() -> Vec<String> {
    [
        "techcrunch.com",
        "venturebeat.com",
        "arxiv.org",
        "technologyreview.com",
        "nature.com",
        "openai.com",
        "deepmind.com",
        "deepmind.google",
        "ai.google",
        "research.google",
        "blog.google",
        "theverge.com",
        "wired.com",
        "huggingface.co",
        "blogs.nvidia.com",
        "blogs.microsoft.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_hashtags() -> Vec<String> {
    ["#AI", "#MachineLearning", "#TechNews"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Everything a run needs besides the oracle settings (see `config::ai`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub feeds: Vec<FeedConfig>,
    pub tracker_path: PathBuf,
    pub output_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub top_n: usize,
    pub similarity_threshold: f64,
    pub max_articles_per_feed: usize,
    pub feed_timeout_secs: u64,
    pub credible_domains: Vec<String>,
    pub num_sources: usize,
    pub hashtags: Vec<String>,
    /// When set, Prometheus exposition is written here at the end of a run.
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            tracker_path: PathBuf::from("data/posts_tracker.csv"),
            output_dir: PathBuf::from("outputs/ready_posts"),
            snapshot_path: PathBuf::from("data/scraped_data.json"),
            top_n: crate::topic::ranker::DEFAULT_TOP_N,
            similarity_threshold: crate::topic::similarity::DEFAULT_SIMILARITY_THRESHOLD,
            max_articles_per_feed: crate::ingest::providers::rss::DEFAULT_MAX_ITEMS,
            feed_timeout_secs: 30,
            credible_domains: default_credible_domains(),
            num_sources: 4,
            hashtags: default_hashtags(),
            metrics_textfile: None,
        }
    }
}

impl AgentConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading agent config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = match ext.as_str() {
            "json" => serde_json::from_str::<AgentConfig>(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            _ => toml::from_str::<AgentConfig>(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
        };
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $AGENT_CONFIG_PATH
    /// 2) config/agent.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_AGENT_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("AGENT_CONFIG_PATH points to non-existent path"));
            }
        }
        let p = PathBuf::from(DEFAULT_AGENT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    fn sanitized(mut self) -> Self {
        self.similarity_threshold = self.similarity_threshold.clamp(0.0, 1.0);
        self.top_n = self.top_n.max(1);
        self.max_articles_per_feed = self.max_articles_per_feed.max(1);
        if self.feed_timeout_secs == 0 {
            self.feed_timeout_secs = 30;
        }
        self.feeds.retain(|f| !f.url.trim().is_empty());
        self.credible_domains = self
            .credible_domains
            .into_iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self
    }
}
