//! Bulk relevance scoring: one oracle request for the whole batch, tolerant line decode.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::{Decoded, ScoredArticle};
use crate::ingest::truncate_chars;
use crate::ingest::types::Article;
use crate::oracle::TextOracle;

const SUMMARY_CHARS: usize = 100;

/// `<index>[:.] <score> <dash> <reason>`
static SCORE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[:.]?\s*(\d+(?:\.\d+)?)\s*[-–—]\s*(.+)$").unwrap());

pub fn build_scoring_prompt(articles: &[Article]) -> String {
    let n = articles.len();
    let mut list = String::new();
    for (i, a) in articles.iter().enumerate() {
        let title = if a.title.trim().is_empty() { "Untitled" } else { a.title.trim() };
        let source = if a.source.trim().is_empty() { "Unknown" } else { a.source.trim() };
        list.push_str(&format!("{}. **{}**\n", i + 1, title));
        let summary = truncate_chars(a.summary.trim(), SUMMARY_CHARS);
        if !summary.is_empty() {
            list.push_str(&format!("   Summary: {summary}...\n"));
        }
        list.push_str(&format!("   Source: {source}\n\n"));
    }

    format!(
        "You are a LinkedIn content strategist and AI expert. Score each of these {n} AI articles for LinkedIn engagement potential.

ARTICLES TO SCORE:
{list}
SCORING CRITERIA (0-10 scale):
- Business Impact (25%): Will executives, CTOs, VPs care about this?
- Discussion Potential (25%): Will this spark meaningful comments and debates?
- Viral/Share Potential (20%): Surprising, breakthrough, or counterintuitive findings?
- Timeliness (15%): Is this trending, newsworthy, or time-sensitive?
- Professional Value (15%): Does this help careers, skills, or business strategy?

SCORING GUIDELINES:
- 9-10: Breakthrough news, game-changing developments, viral potential
- 7-8: Strong business relevance, high engagement expected
- 5-6: Solid professional content, moderate engagement
- 3-4: Niche or technical, limited broad appeal
- 1-2: Low engagement, too academic or narrow

RESPONSE FORMAT (CRITICAL - Follow exactly):
1: [Score] - [Brief reason]
2: [Score] - [Brief reason]
3: [Score] - [Brief reason]
...continue for all {n} articles

Example:
1: 8.5 - Breakthrough AI achievement with huge business impact
2: 6.0 - Solid technical content but limited viral potential
3: 9.0 - Major company announcement, high discussion value

Score each article (1-{n}):"
    )
}

/// Best-effort decode of the scorer reply. Non-empty lines that do not match the
/// line grammar, or carry an out-of-range index/score, are counted in `discarded`.
/// Repeated indices produce repeated entries. Items come back sorted by score,
/// descending, ties in reply order.
pub fn decode_scores(response: &str, articles: &[Article]) -> Decoded<ScoredArticle> {
    let mut items = Vec::new();
    let mut discarded = 0usize;

    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = SCORE_LINE.captures(line) else {
            discarded += 1;
            continue;
        };
        let index = caps[1].parse::<usize>().ok();
        // checked as f64 so values just above 10 are not rounded into range
        let score = caps[2].parse::<f64>().ok();
        match (index, score) {
            (Some(idx), Some(score))
                if (1..=articles.len()).contains(&idx) && (0.0..=10.0).contains(&score) =>
            {
                let mut article = articles[idx - 1].clone();
                article.rationale = Some(caps[3].trim().to_string());
                items.push(ScoredArticle {
                    score: score as f32,
                    article,
                });
            }
            _ => discarded += 1,
        }
    }

    // Vec::sort_by is stable.
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    Decoded { items, discarded }
}

/// Score every article with a single oracle call. Any failure yields an empty list.
pub async fn score_all(oracle: &dyn TextOracle, articles: &[Article]) -> Vec<ScoredArticle> {
    if articles.is_empty() {
        return Vec::new();
    }

    let prompt = build_scoring_prompt(articles);
    info!(target: "topic", count = articles.len(), "requesting relevance scores");
    let Some(response) = oracle.generate(&prompt).await else {
        warn!(target: "topic", "no response from relevance scoring");
        return Vec::new();
    };

    let decoded = decode_scores(&response, articles);
    counter!("topic_scores_parsed_total").increment(decoded.items.len() as u64);
    counter!("topic_score_lines_discarded_total").increment(decoded.discarded as u64);
    info!(
        target: "topic",
        parsed = decoded.items.len(),
        discarded = decoded.discarded,
        "relevance scores decoded"
    );

    for (i, s) in decoded.items.iter().take(5).enumerate() {
        info!(
            target: "topic",
            rank = i + 1,
            score = s.score,
            title = truncate_chars(&s.article.title, 50),
            "top scored"
        );
    }
    decoded.items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arts(n: usize) -> Vec<Article> {
        (1..=n)
            .map(|i| Article::new(format!("Title {i}"), format!("Summary {i}"), "", "Src"))
            .collect()
    }

    #[test]
    fn tolerant_decode_skips_bogus_lines() {
        let d = decode_scores("1: 9.0 - breakthrough\n2: bogus line\n3: 4.5 - niche", &arts(3));
        assert_eq!(d.discarded, 1);
        let got: Vec<_> = d.items.iter().map(|s| (s.score, s.article.title.as_str())).collect();
        assert_eq!(got, [(9.0, "Title 1"), (4.5, "Title 3")]);
        assert_eq!(d.items[1].article.rationale.as_deref(), Some("niche"));
    }

    #[test]
    fn out_of_range_index_and_score_are_discarded() {
        let d = decode_scores("5: 8.0 - x\n0: 3.0 - zero\n2: 11 - too high\n1: 10 - max", &arts(3));
        assert_eq!(d.items.len(), 1);
        assert_eq!(d.items[0].score, 10.0);
        assert_eq!(d.discarded, 3);
    }

    #[test]
    fn scores_just_above_ten_are_rejected() {
        let d = decode_scores("1: 10.000000001 - sneaky
2: 10.0 - exact", &arts(2));
        assert_eq!(d.discarded, 1);
        assert_eq!(d.items.len(), 1);
        assert_eq!(d.items[0].article.title, "Title 2");
    }

    #[test]
    fn separators_and_dashes_vary() {
        let d = decode_scores("1. 6 – en dash\n2 7.25 — em dash\n  3:3-tight  ", &arts(3));
        assert_eq!(d.discarded, 0);
        let scores: Vec<f32> = d.items.iter().map(|s| s.score).collect();
        assert_eq!(scores, [7.25, 6.0, 3.0]);
    }

    #[test]
    fn duplicates_are_kept_and_ties_stay_in_reply_order() {
        let d = decode_scores("2: 5 - first\n1: 5 - second\n2: 8 - again", &arts(2));
        let got: Vec<_> = d
            .items
            .iter()
            .map(|s| (s.score, s.article.rationale.clone().unwrap()))
            .collect();
        assert_eq!(
            got,
            [
                (8.0, "again".to_string()),
                (5.0, "first".to_string()),
                (5.0, "second".to_string())
            ]
        );
    }

    #[test]
    fn blank_lines_are_not_discards() {
        let d = decode_scores("\n\n   \n1: 2 - ok\n", &arts(1));
        assert_eq!(d.items.len(), 1);
        assert_eq!(d.discarded, 0);
    }

    #[test]
    fn prompt_enumerates_and_truncates() {
        let mut a = arts(2);
        a[0].summary = "x".repeat(250);
        a[1].source = String::new();
        a[1].title = " ".into();
        let p = build_scoring_prompt(&a);
        assert!(p.contains("1. **Title 1**"));
        assert!(p.contains(&format!("   Summary: {}...", "x".repeat(100))));
        assert!(!p.contains(&"x".repeat(101)));
        assert!(p.contains("2. **Untitled**"));
        assert!(p.contains("Source: Unknown"));
        assert!(p.contains("Score each article (1-2):"));
    }
}
