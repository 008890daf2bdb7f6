// src/topic/mod.rs
//! Topic selection pipeline:
//! 1) similarity filter against posted topics
//! 2) one bulk LLM scoring call
//! 3) top-N shortlist
//! 4) one LLM tie-break call (falls back to the top candidate)
//!
//! Every stage degrades to "no selection" instead of failing; callers check
//! `TopicSelection::is_empty()`.

pub mod ranker;
pub mod scorer;
pub mod selector;
pub mod similarity;

use metrics::describe_counter;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::info;

use crate::history::HistoryStore;
use crate::ingest::types::Article;
use crate::oracle::DynTextOracle;

/// Score (0..=10) paired with the article it was given for.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub score: f32,
    pub article: Article,
}

/// Result of a best-effort decode: what parsed, and how many inputs did not.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub discarded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopicSelection {
    /// Title of the chosen article; empty when nothing could be selected.
    pub topic: String,
    pub supporting_articles: Vec<Article>,
}

impl TopicSelection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_empty()
    }
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "topic_scores_parsed_total",
            "Scorer lines decoded into (score, article) pairs."
        );
        describe_counter!(
            "topic_score_lines_discarded_total",
            "Scorer lines dropped by the tolerant decoder."
        );
        describe_counter!(
            "topic_selection_fallback_total",
            "Final selections that fell back to the top scored candidate."
        );
        describe_counter!("oracle_calls_total", "Real (non-cached) oracle calls.");
        describe_counter!("oracle_failures_total", "Oracle calls that yielded nothing.");
    });
}

pub struct TopicSelector {
    oracle: DynTextOracle,
    top_n: usize,
    similarity_threshold: f64,
}

impl TopicSelector {
    pub fn new(oracle: DynTextOracle) -> Self {
        Self {
            oracle,
            top_n: ranker::DEFAULT_TOP_N,
            similarity_threshold: similarity::DEFAULT_SIMILARITY_THRESHOLD,
        }
    }

    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n.max(1);
        self
    }

    pub fn with_similarity_threshold(mut self, t: f64) -> Self {
        self.similarity_threshold = t.clamp(0.0, 1.0);
        self
    }

    /// Filter → score → shortlist → final pick. Never fails.
    pub async fn select_best_topic(&self, articles: &[Article], history: &[String]) -> TopicSelection {
        ensure_metrics_described();
        info!(target: "topic", count = articles.len(), "starting topic selection");
        if articles.is_empty() {
            return TopicSelection::empty();
        }

        let filtered = similarity::filter_posted(articles, history, self.similarity_threshold);
        info!(
            target: "topic",
            kept = filtered.kept.len(),
            duplicates = filtered.duplicates,
            untitled = filtered.untitled,
            history = history.len(),
            "after duplicate filtering"
        );
        if filtered.kept.is_empty() {
            return TopicSelection::empty();
        }

        let scored = scorer::score_all(self.oracle.as_ref(), &filtered.kept).await;
        if scored.is_empty() {
            return TopicSelection::empty();
        }

        let candidates = ranker::top_n(&scored, self.top_n);
        info!(target: "topic", count = candidates.len(), "shortlisted for final selection");

        selector::select(self.oracle.as_ref(), &candidates).await
    }

    /// Same as `select_best_topic`, loading history from `store` first.
    /// The only error is a history resource that exists but cannot be read.
    pub async fn select_with_store(
        &self,
        articles: &[Article],
        store: &dyn HistoryStore,
    ) -> anyhow::Result<TopicSelection> {
        if articles.is_empty() {
            return Ok(TopicSelection::empty());
        }
        let history = store.load().await?;
        info!(target: "topic", count = history.len(), "previously posted topics");
        Ok(self.select_best_topic(articles, &history).await)
    }
}
