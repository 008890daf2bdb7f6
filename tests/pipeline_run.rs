// tests/pipeline_run.rs
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use post_curator::ingest::providers::rss::RssFeedSource;
use post_curator::ingest::types::{Article, ArticleSource};
use post_curator::oracle::mock::{ScriptedOracle, StaticImageOracle};
use post_curator::oracle::DisabledOracle;
use post_curator::sources::SourceValidator;
use post_curator::topic::TopicSelector;
use post_curator::tracker::CsvTracker;
use post_curator::{run_once, RunContext, RunOutcome};

const RSS_XML: &str = include_str!("fixtures/ai_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/atom.xml");

fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        32,
        18,
        image::Rgb([0, 40, 90]),
    ));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn fixture_sources() -> Vec<Box<dyn ArticleSource>> {
    vec![
        Box::new(RssFeedSource::from_fixture("AI Digest", RSS_XML)),
        Box::new(RssFeedSource::from_fixture("Lab Blog", ATOM_XML)),
    ]
}

fn context(
    root: &Path,
    sources: Vec<Box<dyn ArticleSource>>,
    oracle: Arc<ScriptedOracle>,
    image: Option<Vec<u8>>,
) -> RunContext {
    let image_oracle: post_curator::oracle::DynImageOracle = match image {
        Some(bytes) => Arc::new(StaticImageOracle { bytes }),
        None => Arc::new(DisabledOracle),
    };
    RunContext {
        sources,
        selector: TopicSelector::new(oracle.clone()),
        text_oracle: oracle,
        image_oracle,
        tracker: CsvTracker::new(root.join("data/posts.csv")),
        validator: SourceValidator::new(vec![
            "arxiv.org".into(),
            "technologyreview.com".into(),
        ]),
        snapshot_path: root.join("data/scraped.json"),
        output_dir: root.join("outputs"),
        hashtags: vec!["#AI".into(), "#MachineLearning".into()],
        num_sources: 4,
    }
}

#[tokio::test]
async fn full_run_writes_tracker_report_and_image() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    // previously posted: filtered out of this run
    CsvTracker::new(root.join("data/posts.csv"))
        .append_post("Open weights model tops coding leaderboard", "old", &[], None)
        .unwrap();

    let oracle = Arc::new(ScriptedOracle::new([
        Some("1: 6 - routing\n2: 9 - benchmark debate\n3: 7 - robots\n4: 5 - distill"),
        Some("Selected: 1\nFinal Reason: sparks debate"),
        Some("Frontier models still stumble on hard math. #AI"),
        Some("abstract glowing benchmark chart"),
    ]));
    let ctx = context(root, fixture_sources(), oracle.clone(), Some(png_bytes()));

    let outcome = run_once(&ctx).await.unwrap();
    let RunOutcome::Ready {
        topic,
        report_path,
        image_path,
    } = outcome
    else {
        panic!("expected a ready post");
    };
    assert_eq!(topic, "New benchmark exposes reasoning gaps in frontier models");
    assert_eq!(oracle.calls(), 4);
    assert!(!oracle.prompts()[0].contains("Open weights model"));

    let image_path = image_path.expect("image saved");
    let img = image::open(&image_path).unwrap();
    assert_eq!((img.width(), img.height()), (1200, 675));

    let report = fs::read_to_string(&report_path).unwrap();
    assert!(report.contains(&format!("TOPIC: {topic}")));
    assert!(report.contains("Frontier models still stumble on hard math. #AI"));
    assert!(report.contains("GENERATED IMAGE"));
    assert!(report.contains("https://www.technologyreview.com/2025/10/06/benchmark"));

    let rows = ctx.tracker.all_posts().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].topic, topic);
    assert!(rows[1].sources.contains("technologyreview.com"));

    let snap: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("data/scraped.json")).unwrap()).unwrap();
    assert_eq!(snap["total_articles"], 5);
    assert_eq!(snap["sources_count"], 2);
}

#[tokio::test]
async fn missing_post_content_leaves_tracker_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let oracle = Arc::new(ScriptedOracle::new([
        Some("1: 8 - good"),
        Some("Selected: 1"),
        None,
    ]));
    let ctx = context(root, fixture_sources(), oracle, None);

    let outcome = run_once(&ctx).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::NoContent {
            topic: "Sparse mixture-of-experts cuts inference cost in half".into()
        }
    );
    assert!(!root.join("data/posts.csv").exists());
    assert!(!root.join("outputs").exists());
    assert!(root.join("data/scraped.json").exists());
}

#[tokio::test]
async fn unscorable_articles_mean_no_topic() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new([Some("no idea")]));
    let ctx = context(dir.path(), fixture_sources(), oracle, None);
    assert_eq!(run_once(&ctx).await.unwrap(), RunOutcome::NoTopic);
}

struct Down;

#[async_trait]
impl ArticleSource for Down {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        Err(anyhow!("dns failure"))
    }
    fn name(&self) -> &str {
        "down"
    }
}

#[tokio::test]
async fn no_articles_stops_before_any_output() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new([Some("1: 9 - x")]));
    let ctx = context(dir.path(), vec![Box::new(Down)], oracle.clone(), None);

    assert_eq!(run_once(&ctx).await.unwrap(), RunOutcome::NoArticles);
    assert_eq!(oracle.calls(), 0);
    assert!(!dir.path().join("data/scraped.json").exists());
}

#[tokio::test]
async fn text_only_run_has_no_image_section() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = Arc::new(ScriptedOracle::new([
        Some("1: 8 - good"),
        Some("Selected: 1"),
        Some("Post body"),
        Some("prompt"),
    ]));
    let ctx = context(dir.path(), fixture_sources(), oracle, None);

    let RunOutcome::Ready {
        report_path,
        image_path,
        ..
    } = run_once(&ctx).await.unwrap()
    else {
        panic!("expected a ready post");
    };
    assert!(image_path.is_none());
    let report = fs::read_to_string(report_path).unwrap();
    assert!(!report.contains("GENERATED IMAGE"));
    assert!(report.contains("https://arxiv.org/abs/2510.00001"));
}
