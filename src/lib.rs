// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod content;
pub mod history;
pub mod ingest;
pub mod media;
pub mod metrics;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod topic;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::history::{HistoryStore, InMemoryHistory};
pub use crate::ingest::types::{Article, ArticleSource};
pub use crate::oracle::{ImageOracle, TextOracle};
pub use crate::pipeline::{run_once, RunContext, RunOutcome};
pub use crate::topic::{TopicSelection, TopicSelector};
