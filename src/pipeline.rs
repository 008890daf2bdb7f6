//! One end-to-end run: collect, snapshot, pick a topic, write the post and its
//! artifacts. Stages are sequential; nothing is persisted to the tracker until
//! both a topic and post content exist.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use tracing::{error, info, warn};

use crate::config::AgentConfig;
use crate::content;
use crate::ingest::{self, providers::rss::RssFeedSource, types::ArticleSource};
use crate::media;
use crate::oracle::{DynImageOracle, DynTextOracle};
use crate::report::{self, ReportInput};
use crate::sources::SourceValidator;
use crate::topic::TopicSelector;
use crate::tracker::CsvTracker;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every feed failed or returned nothing.
    NoArticles,
    /// Articles existed but no topic survived filtering and scoring.
    NoTopic,
    /// A topic was chosen but the post body could not be generated.
    NoContent { topic: String },
    Ready {
        topic: String,
        report_path: PathBuf,
        image_path: Option<PathBuf>,
    },
}

pub struct RunContext {
    pub sources: Vec<Box<dyn ArticleSource>>,
    pub selector: TopicSelector,
    pub text_oracle: DynTextOracle,
    pub image_oracle: DynImageOracle,
    pub tracker: CsvTracker,
    pub validator: SourceValidator,
    pub snapshot_path: PathBuf,
    pub output_dir: PathBuf,
    pub hashtags: Vec<String>,
    pub num_sources: usize,
}

impl RunContext {
    /// Wire HTTP feed sources and file-backed stores from config.
    pub fn from_config(
        cfg: &AgentConfig,
        text_oracle: DynTextOracle,
        image_oracle: DynImageOracle,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(cfg.feed_timeout_secs);
        let mut sources: Vec<Box<dyn ArticleSource>> = Vec::with_capacity(cfg.feeds.len());
        for f in &cfg.feeds {
            let src = RssFeedSource::from_url(&f.name, &f.url, timeout)?
                .with_max_items(cfg.max_articles_per_feed);
            sources.push(Box::new(src));
        }

        let selector = TopicSelector::new(text_oracle.clone())
            .with_top_n(cfg.top_n)
            .with_similarity_threshold(cfg.similarity_threshold);

        Ok(Self {
            sources,
            selector,
            text_oracle,
            image_oracle,
            tracker: CsvTracker::new(&cfg.tracker_path),
            validator: SourceValidator::new(cfg.credible_domains.clone()),
            snapshot_path: cfg.snapshot_path.clone(),
            output_dir: cfg.output_dir.clone(),
            hashtags: cfg.hashtags.clone(),
            num_sources: cfg.num_sources,
        })
    }
}

/// Run every stage once. Only I/O failures on local artifacts (snapshot,
/// tracker, report) and an unreadable history are errors.
pub async fn run_once(ctx: &RunContext) -> Result<RunOutcome> {
    info!(target: "pipeline", feeds = ctx.sources.len(), "step 1: collecting articles");
    let articles = ingest::collect(&ctx.sources).await;
    info!(target: "pipeline", count = articles.len(), "total articles collected");
    if articles.is_empty() {
        error!(target: "pipeline", "no articles found, check connectivity and feed urls");
        return Ok(RunOutcome::NoArticles);
    }
    report::write_snapshot(&ctx.snapshot_path, &articles)?;

    info!(target: "pipeline", "step 2: selecting topic");
    let selection = ctx.selector.select_with_store(&articles, &ctx.tracker).await?;
    if selection.is_empty() {
        error!(target: "pipeline", "could not select a suitable topic");
        return Ok(RunOutcome::NoTopic);
    }
    let topic = selection.topic.clone();

    info!(target: "pipeline", "step 3: generating post");
    let Some(post) = content::generate_post(
        ctx.text_oracle.as_ref(),
        &topic,
        &selection.supporting_articles,
        &ctx.hashtags,
    )
    .await
    else {
        return Ok(RunOutcome::NoContent { topic });
    };

    info!(target: "pipeline", "step 4: extracting sources");
    let sources = ctx
        .validator
        .extract_sources(&selection.supporting_articles, ctx.num_sources);

    info!(target: "pipeline", "step 5: generating image");
    let prompt = content::image_prompt(ctx.text_oracle.as_ref(), &topic, &post).await;
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let image_path = match ctx.image_oracle.generate_image(&prompt).await {
        Some(bytes) => {
            let path = ctx.output_dir.join(format!("post_{stamp}.png"));
            match media::save_image(&bytes, &path) {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!(target: "pipeline", error = ?e, "image save failed, continuing without it");
                    None
                }
            }
        }
        None => {
            warn!(target: "pipeline", "no image generated, continuing without it");
            None
        }
    };

    info!(target: "pipeline", "step 6: updating tracker");
    ctx.tracker
        .append_post(&topic, &post, &sources, image_path.as_deref())?;

    info!(target: "pipeline", "step 7: writing report");
    let report_path = report::write_report(
        &ctx.output_dir,
        &stamp,
        &ReportInput {
            topic: &topic,
            content: &post,
            image: image_path.as_deref().map(|p| (p, prompt.as_str())),
            sources: &sources,
        },
    )?;

    info!(
        target: "pipeline",
        report = %report_path.display(),
        image = ?image_path,
        "post ready"
    );
    Ok(RunOutcome::Ready {
        topic,
        report_path,
        image_path,
    })
}
