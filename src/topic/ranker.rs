use tracing::info;

use super::ScoredArticle;
use crate::ingest::truncate_chars;
use crate::ingest::types::Article;

pub const DEFAULT_TOP_N: usize = 10;

/// First `n` of an already-sorted score list, each copied with its score attached.
pub fn top_n(scored: &[ScoredArticle], n: usize) -> Vec<Article> {
    scored
        .iter()
        .take(n)
        .enumerate()
        .map(|(i, s)| {
            let mut article = s.article.clone();
            article.score = Some(s.score);
            info!(
                target: "topic",
                rank = i + 1,
                score = s.score,
                title = truncate_chars(&article.title, 60),
                reason = article.rationale.as_deref().unwrap_or("No reason provided"),
                "candidate"
            );
            article
        })
        .collect()
}
