//! Run artifacts: the scraped-article snapshot and the human-readable post report.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::ingest::types::Article;
use crate::sources::Source;

#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub last_updated: String,
    pub articles: &'a [Article],
    pub total_articles: usize,
    pub sources_count: usize,
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("tmp");
    let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
    f.write_all(bytes)?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Overwrite the snapshot with this run's articles.
pub fn write_snapshot(path: &Path, articles: &[Article]) -> Result<()> {
    let sources_count = articles
        .iter()
        .map(|a| a.source.as_str())
        .collect::<HashSet<_>>()
        .len();
    let snap = Snapshot {
        last_updated: Local::now().to_rfc3339(),
        articles,
        total_articles: articles.len(),
        sources_count,
    };
    let json = serde_json::to_vec_pretty(&snap)?;
    write_atomic(path, &json)?;
    info!(count = articles.len(), path = %path.display(), "saved article snapshot");
    Ok(())
}

pub struct ReportInput<'a> {
    pub topic: &'a str,
    pub content: &'a str,
    pub image: Option<(&'a Path, &'a str)>,
    pub sources: &'a [Source],
}

pub fn render_report(input: &ReportInput<'_>) -> String {
    let heavy = "=".repeat(70);
    let light = "-".repeat(70);
    let mut out = String::new();

    out.push_str(&format!("{heavy}\nLINKEDIN POST - TECHNICAL AI INNOVATION\n{heavy}\n\n"));
    out.push_str(&format!("TOPIC: {}\n\n", input.topic));
    out.push_str(&format!("{light}\nPOST CONTENT:\n{light}\n{}\n\n", input.content));

    if let Some((path, prompt)) = input.image {
        out.push_str(&format!("{light}\nGENERATED IMAGE:\n{light}\n"));
        out.push_str(&format!("Image file: {}\n", path.display()));
        out.push_str(&format!("Image prompt used: {prompt}\n\n"));
    }

    out.push_str(&format!("{light}\nSOURCES FOR VERIFICATION:\n{light}\n"));
    for (i, s) in input.sources.iter().enumerate() {
        out.push_str(&format!("{}. {}\n   {}\n\n", i + 1, s.title, s.url));
    }

    out.push_str(&format!("{heavy}\nNEXT STEPS:\n"));
    out.push_str("1. Review the technical post content\n");
    out.push_str("2. Check the AI-generated image\n");
    out.push_str("3. Verify all sources are accurate\n");
    out.push_str("4. Post to LinkedIn with image\n");
    out.push_str("5. Mark the topic as posted in the tracker\n");
    out.push_str(&format!("{heavy}\n"));
    out
}

/// Write `post_<stamp>.txt` under `dir`.
pub fn write_report(dir: &Path, stamp: &str, input: &ReportInput<'_>) -> Result<PathBuf> {
    let path = dir.join(format!("post_{stamp}.txt"));
    write_atomic(&path, render_report(input).as_bytes())?;
    info!(path = %path.display(), "report written");
    Ok(path)
}
