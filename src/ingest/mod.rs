// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::{Article, ArticleSource};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up in the textfile export).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_articles_total",
            "Articles parsed from all feed sources."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Feed fetch/parse errors (source skipped)."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when feed collection last ran."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, ASCII quotes, collapse whitespace,
/// then cap at `max_chars` characters.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags: block tags become a space, inline tags vanish
    static RE_BLOCK: OnceCell<regex::Regex> = OnceCell::new();
    let re_block = RE_BLOCK.get_or_init(|| {
        regex::Regex::new(r"(?is)</?(?:p|br|div|li|ul|ol|h[1-6]|tr|td|th|blockquote|hr)\b[^>]*>")
            .unwrap()
    });
    out = re_block.replace_all(&out, " ").to_string();
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    truncate_chars(&out, max_chars).to_string()
}

/// Char-boundary-safe prefix of at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Fetch every source in order and accumulate whatever succeeds.
/// A failing source is logged and counted, never fatal to the others.
pub async fn collect(sources: &[Box<dyn ArticleSource>]) -> Vec<Article> {
    ensure_metrics_described();

    let mut all = Vec::new();
    for s in sources {
        match s.fetch_latest().await {
            Ok(mut v) => {
                tracing::info!(target: "ingest", source = s.name(), count = v.len(), "feed fetched");
                all.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = s.name(), "feed skipped");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0);
    counter!("ingest_articles_total").increment(all.len() as u64);
    gauge!("ingest_last_run_ts").set(now as f64);

    all
}
