// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::ingest::normalize_text;
use crate::ingest::types::{Article, ArticleSource};

pub const DEFAULT_MAX_ITEMS: usize = 10;
pub const SUMMARY_MAX_CHARS: usize = 300;

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// RFC 2822 `pubDate` -> RFC 3339 UTC; unparseable dates are kept verbatim.
fn normalize_feed_date(ts: &str) -> String {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .and_then(|dt| dt.to_offset(UtcOffset::UTC).format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.trim().to_string())
}

pub struct RssFeedSource {
    name: String,
    max_items: usize,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedSource {
    /// Parse from in-memory XML (tests, offline runs).
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            max_items: DEFAULT_MAX_ITEMS,
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Fetch over HTTP; `timeout` bounds the whole request for this feed only.
    pub fn from_url(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("post-curator/0.1 (feed reader)")
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            name: name.to_string(),
            max_items: DEFAULT_MAX_ITEMS,
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        })
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<Article>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(s);

        let out: Vec<Article> = if looks_like_atom(&xml_clean) {
            let feed: AtomFeed = from_str(&xml_clean)
                .with_context(|| format!("parsing atom xml for {}", self.name))?;
            feed.entry
                .into_iter()
                .take(self.max_items)
                .map(|e| self.article_from_atom(e))
                .collect()
        } else {
            let rss: Rss = from_str(&xml_clean)
                .with_context(|| format!("parsing rss xml for {}", self.name))?;
            rss.channel
                .item
                .into_iter()
                .take(self.max_items)
                .map(|it| self.article_from_rss(it))
                .collect()
        };

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        Ok(out)
    }

    fn article_from_rss(&self, it: Item) -> Article {
        Article {
            title: normalize_text(it.title.as_deref().unwrap_or_default(), SUMMARY_MAX_CHARS),
            summary: normalize_text(
                it.description.as_deref().unwrap_or_default(),
                SUMMARY_MAX_CHARS,
            ),
            url: it.link.unwrap_or_default().trim().to_string(),
            source: self.name.clone(),
            date: it.pub_date.as_deref().map(normalize_feed_date),
            ..Article::default()
        }
    }

    fn article_from_atom(&self, e: AtomEntry) -> Article {
        // Prefer rel="alternate" (or rel-less) links; fall back to whatever comes first.
        let url = e
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.link.first())
            .and_then(|l| l.href.clone())
            .unwrap_or_default();
        let summary = e.summary.or(e.content).map(|t| t.value).unwrap_or_default();
        Article {
            title: normalize_text(
                &e.title.map(|t| t.value).unwrap_or_default(),
                SUMMARY_MAX_CHARS,
            ),
            summary: normalize_text(&summary, SUMMARY_MAX_CHARS),
            url: url.trim().to_string(),
            source: self.name.clone(),
            date: e.published.or(e.updated).map(|d| d.trim().to_string()),
            ..Article::default()
        }
    }
}

#[async_trait]
impl ArticleSource for RssFeedSource {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn looks_like_atom(xml: &str) -> bool {
    !xml.contains("<rss") && !xml.contains("<channel") && xml.contains("<feed")
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
