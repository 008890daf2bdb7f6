//! Near-duplicate filter against previously posted topics (token-set Jaccard on titles).

use std::collections::HashSet;

use crate::ingest::types::Article;

/// Strictly-greater similarity than this marks a title as already covered.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

fn tokens(s: &str) -> HashSet<String> {
    s.split_whitespace().map(|w| w.to_lowercase()).collect()
}

fn jaccard_sets(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    inter as f64 / union as f64
}

/// |A∩B| / |A∪B| over lower-cased whitespace tokens; 0.0 if either side has no tokens.
pub fn jaccard(a: &str, b: &str) -> f64 {
    jaccard_sets(&tokens(a), &tokens(b))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Survivors, in input order.
    pub kept: Vec<Article>,
    pub duplicates: usize,
    pub untitled: usize,
}

/// Drop untitled articles and those whose title is > `threshold` similar to any
/// history topic.
pub fn filter_posted(articles: &[Article], history: &[String], threshold: f64) -> FilterOutcome {
    let history_sets: Vec<HashSet<String>> = history.iter().map(|t| tokens(t)).collect();

    let mut out = FilterOutcome::default();
    for article in articles {
        let title = article.title.trim();
        if title.is_empty() {
            out.untitled += 1;
            continue;
        }
        let title_set = tokens(title);
        let is_duplicate = history_sets
            .iter()
            .any(|h| jaccard_sets(&title_set, h) > threshold);
        if is_duplicate {
            tracing::debug!(target: "topic", title, "already covered");
            out.duplicates += 1;
            continue;
        }
        out.kept.push(article.clone());
    }
    out
}
