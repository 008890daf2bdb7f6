//! Final tie-break over the shortlisted candidates.
//!
//! Selection always succeeds for a non-empty shortlist: an unusable or missing
//! oracle reply falls back to candidate 0, the highest scored.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use super::TopicSelection;
use crate::ingest::truncate_chars;
use crate::ingest::types::Article;
use crate::oracle::TextOracle;

const SUMMARY_CHARS: usize = 150;

static SELECTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)selected:\s*(\d+)").unwrap());
static BARE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());

pub fn build_selection_prompt(candidates: &[Article]) -> String {
    let n = candidates.len();
    let mut list = String::new();
    for (i, a) in candidates.iter().enumerate() {
        let title = if a.title.trim().is_empty() { "Untitled" } else { a.title.trim() };
        let source = if a.source.trim().is_empty() { "Unknown" } else { a.source.trim() };
        list.push_str(&format!(
            "{}. **{}** (LLM Score: {:?}/10)\n   Source: {}\n   Why it scored high: {}\n   Summary: {}...\n\n",
            i + 1,
            title,
            a.score.unwrap_or(0.0),
            source,
            a.rationale.as_deref().unwrap_or("No reason"),
            truncate_chars(a.summary.trim(), SUMMARY_CHARS),
        ));
    }

    format!(
        "You are a LinkedIn content strategist making the FINAL decision. These are the top {n} AI articles (already pre-scored by LLM for engagement potential).

TOP CANDIDATES:
{list}
FINAL SELECTION CRITERIA:
- Maximum LinkedIn Impact: Which will get the most shares, comments, saves?
- Executive Appeal: What would a CEO, CTO, or VP want to discuss?
- Right-Now Relevance: What's trending and timely TODAY?
- Thought Leadership: What positions you as an AI expert and innovator?
- Broad Professional Appeal: Valuable to both tech and business professionals?

INSTRUCTIONS:
- Choose EXACTLY ONE number (1-{n})
- This will be your LinkedIn post topic for today
- Consider: Would YOU personally share this with your network?
- Think: What would drive the most valuable professional discussions?

RESPONSE FORMAT:
Selected: [NUMBER]
Final Reason: [One compelling sentence why THIS topic beats all others for LinkedIn success]

Your final choice:"
    )
}

/// 0-based index of the chosen candidate, if the reply names one in `1..=count`.
///
/// `Selected: N` wins when in range; otherwise the first standalone in-range
/// number anywhere in the reply.
pub fn parse_selection(response: &str, count: usize) -> Option<usize> {
    let in_range = |s: &str| s.parse::<usize>().ok().filter(|n| (1..=count).contains(n));

    if let Some(n) = SELECTED
        .captures(response)
        .and_then(|c| in_range(&c[1]))
    {
        return Some(n - 1);
    }
    BARE_NUMBER
        .captures_iter(response)
        .find_map(|c| in_range(&c[1]))
        .map(|n| n - 1)
}

/// Ask the oracle to pick one candidate; see module docs for the fallback.
pub async fn select(oracle: &dyn TextOracle, candidates: &[Article]) -> TopicSelection {
    let Some(top) = candidates.first() else {
        return TopicSelection::empty();
    };

    info!(target: "topic", count = candidates.len(), "requesting final selection");
    let prompt = build_selection_prompt(candidates);
    let parsed = oracle
        .generate(&prompt)
        .await
        .and_then(|reply| parse_selection(&reply, candidates.len()));

    let chosen = match parsed {
        Some(idx) => &candidates[idx],
        None => {
            warn!(target: "topic", "could not parse final selection, using top scored article");
            counter!("topic_selection_fallback_total").increment(1);
            top
        }
    };

    info!(
        target: "topic",
        topic = truncate_chars(&chosen.title, 60),
        score = chosen.score.unwrap_or(0.0),
        source = %chosen.source,
        "final selection"
    );
    TopicSelection {
        topic: chosen.title.clone(),
        supporting_articles: vec![chosen.clone()],
    }
}
