//! CSV post tracker: one row per generated post. Doubles as the topic history.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::history::HistoryStore;
use crate::sources::Source;

fn now_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Column order matches the header row: date, topic, post_content, sources,
/// posted, posted_date, image_path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub date: String,
    pub topic: String,
    pub post_content: String,
    /// JSON array of `{title, url}`.
    pub sources: String,
    pub posted: bool,
    pub posted_date: String,
    pub image_path: String,
}

#[derive(Debug, Clone)]
pub struct CsvTracker {
    path: PathBuf,
}

impl CsvTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one unposted row; writes the header when the file is new or empty.
    pub fn append_post(
        &self,
        topic: &str,
        content: &str,
        sources: &[Source],
        image_path: Option<&Path>,
    ) -> Result<PostRecord> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating tracker dir {}", dir.display()))?;
        }
        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let record = PostRecord {
            date: now_stamp(),
            topic: topic.to_string(),
            post_content: content.to_string(),
            sources: serde_json::to_string(sources)?,
            posted: false,
            posted_date: String::new(),
            image_path: image_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening tracker {}", self.path.display()))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        wtr.serialize(&record)?;
        wtr.flush()?;

        info!(topic = %crate::ingest::truncate_chars(topic, 50), "added post to tracker");
        Ok(record)
    }

    /// All rows; a missing tracker file is an empty list.
    pub fn all_posts(&self) -> Result<Vec<PostRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("opening tracker {}", self.path.display()))?;
        let mut out = Vec::new();
        for row in rdr.deserialize::<PostRecord>() {
            out.push(row.with_context(|| format!("malformed row in {}", self.path.display()))?);
        }
        Ok(out)
    }

    /// Flag every row with this exact topic as posted now. Returns rows updated.
    pub fn mark_as_posted(&self, topic: &str) -> Result<usize> {
        let mut rows = self.all_posts()?;
        let stamp = now_stamp();
        let mut updated = 0usize;
        for r in rows.iter_mut().filter(|r| r.topic == topic) {
            r.posted = true;
            r.posted_date = stamp.clone();
            updated += 1;
        }
        if updated == 0 {
            return Ok(0);
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp)
                .with_context(|| format!("writing {}", tmp.display()))?;
            for r in &rows {
                wtr.serialize(r)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        info!(topic, updated, "marked as posted");
        Ok(updated)
    }

    /// Values of the `topic` column only; other columns may be absent or malformed.
    fn topics(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening tracker {}", self.path.display()))?;
        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let Some(idx) = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("topic"))
        else {
            bail!("tracker {} has no `topic` column", self.path.display());
        };

        let mut out = Vec::new();
        for rec in rdr.records() {
            let rec = rec.with_context(|| format!("malformed row in {}", self.path.display()))?;
            if let Some(t) = rec.get(idx).map(str::trim).filter(|t| !t.is_empty()) {
                out.push(t.to_string());
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl HistoryStore for CsvTracker {
    async fn load(&self) -> Result<Vec<String>> {
        self.topics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let t = CsvTracker::new(dir.path().join("t.csv"));
        t.append_post("one", "c1", &[], None).unwrap();
        t.append_post("two", "c2", &[], None).unwrap();
        let raw = fs::read_to_string(t.path()).unwrap();
        assert_eq!(raw.matches("post_content").count(), 1);
        assert!(raw.starts_with("date,topic,post_content,sources,posted,posted_date,image_path"));
    }

    #[test]
    fn topics_tolerate_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.csv");
        fs::write(&p, "id,Topic,notes\n1,Alpha launch,x\n2,,y\n3, Beta  ,z\n").unwrap();
        assert_eq!(CsvTracker::new(&p).topics().unwrap(), vec!["Alpha launch", "Beta"]);
    }

    #[test]
    fn empty_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("t.csv");
        fs::write(&p, "").unwrap();
        assert!(CsvTracker::new(&p).topics().unwrap().is_empty());
    }
}
