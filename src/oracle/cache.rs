//! Caching wrapper: prompt-hash file cache + persisted daily call limit.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{OracleError, Provider, TextOracle};

/// Cached replies older than this are removed when the wrapper is built.
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedText {
    text: String,
}

/// Counter state is guarded by a `Mutex`; cache files are written via tmp + rename.
pub struct CachingOracle<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingOracle<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let pruned = prune_stale(&cache_dir, CACHE_MAX_AGE);
        if pruned > 0 {
            debug!(target: "oracle", pruned, "removed stale cache entries");
        }
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today (cache hits are not counted).
    pub fn calls_today(&self) -> u32 {
        let g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if g.is_expired() {
            0
        } else {
            g.count
        }
    }

    async fn generate_impl(&self, prompt: &str) -> Result<String, OracleError> {
        // 1) Cache lookup.
        let key = cache_key(self.inner.name(), self.inner.model(), prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "oracle", %key, "cache hit");
            return Ok(hit.text);
        }

        // 2) Daily limit (real calls only).
        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                return Err(OracleError::DailyLimit(self.daily_limit_max));
            }
        }

        // 3) Real call. Attempts count against the limit whether or not they succeed.
        counter!("oracle_calls_total", "provider" => self.inner.name()).increment(1);
        let out = self.inner.fetch(prompt).await;
        {
            let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
            g.count = g.count.saturating_add(1);
            let _ = save_daily_counter(&self.cache_dir, &g);
        }

        let text = out?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(OracleError::Empty);
        }
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CachedText { text: text.clone() }) {
            debug!(target: "oracle", error = %e, "cache write failed");
        }
        Ok(text)
    }
}

impl<P: Provider> TextOracle for CachingOracle<P> {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            match self.generate_impl(prompt).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(target: "oracle", provider = self.inner.name(), error = %e, "text generation failed");
                    counter!("oracle_failures_total", "provider" => self.inner.name()).increment(1);
                    None
                }
            }
        })
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

/// Replies are scoped by provider and model so mock or cross-provider answers
/// never stand in for real ones.
fn cache_key(provider: &str, model: &str, prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(prompt.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedText> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

/// Delete cached replies whose mtime is older than `max_age`. The daily
/// counter file is kept.
fn prune_stale(dir: &Path, max_age: Duration) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let counter = counter_path(dir);
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path == counter || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stale = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| now.duration_since(t).ok())
            .is_some_and(|age| age > max_age);
        if stale && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedText) -> io::Result<()> {
    let json = serde_json::to_vec(value).map_err(io::Error::other)?;
    write_atomic(&cache_path(dir, key), &json)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let json = serde_json::to_vec(dc).map_err(io::Error::other)?;
    write_atomic(&counter_path(dir), &json)
}
