//! Run configuration: agent settings (feeds, paths, ranking knobs) and oracle settings.

pub mod ai;
pub mod app;

pub use ai::AiConfig;
pub use app::{AgentConfig, FeedConfig};
