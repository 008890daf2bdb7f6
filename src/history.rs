//! history.rs — previously posted topics, read fresh on every run.

use std::sync::Mutex;

use anyhow::Result;

/// Anything that can list previously used topics, oldest first.
/// A missing resource is an empty history, not an error.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> Result<Vec<String>>;
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    inner: Mutex<Vec<String>>,
}

impl InMemoryHistory {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Mutex::new(topics.into_iter().map(Into::into).collect()),
        }
    }

    pub fn push(&self, topic: &str) {
        let mut v = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        v.push(topic.to_string());
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistory {
    async fn load(&self) -> Result<Vec<String>> {
        let v = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(v.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_appends_in_order() {
        let h = InMemoryHistory::new(["first"]);
        h.push("second");
        assert_eq!(h.load().await.unwrap(), vec!["first", "second"]);
    }
}
