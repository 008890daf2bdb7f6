//! post-curator binary: one topic-selection and post-drafting run per invocation,
//! plus small tracker maintenance commands.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use post_curator::config::{AgentConfig, AiConfig};
use post_curator::metrics::Metrics;
use post_curator::oracle::build_oracles;
use post_curator::tracker::CsvTracker;
use post_curator::{run_once, RunContext, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "post-curator", version, about = "Pick today's AI topic and draft a LinkedIn post")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect feeds, select a topic and write the post artifacts (default)
    Run,
    /// Print tracked posts
    History,
    /// Mark every tracker row with this topic as posted
    MarkPosted { topic: String },
}

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

async fn run(cfg: &AgentConfig) -> Result<RunOutcome> {
    let ai = AiConfig::load_default()?;
    info!(provider = %ai.provider, enabled = ai.enabled, "oracle config loaded");
    let (text, image) = build_oracles(&ai)?;
    let ctx = RunContext::from_config(cfg, text, image)?;
    run_once(&ctx).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let cfg = match AgentConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            error!(error = ?e, "failed to load agent config");
            return ExitCode::FAILURE;
        }
    };

    let result: Result<bool> = match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let metrics = match cfg.metrics_textfile {
                Some(_) => Metrics::install().map(Some),
                None => Ok(None),
            };
            match metrics {
                Ok(metrics) => {
                    let out = run(&cfg).await;
                    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_textfile) {
                        if let Err(e) = m.write_textfile(path) {
                            error!(error = ?e, "failed to write metrics textfile");
                        }
                    }
                    out.map(|o| {
                        info!(outcome = ?o, "run finished");
                        matches!(o, RunOutcome::Ready { .. })
                    })
                }
                Err(e) => Err(e),
            }
        }
        Command::History => CsvTracker::new(&cfg.tracker_path).all_posts().map(|rows| {
            for r in &rows {
                println!(
                    "{}\t{}\t{}",
                    r.date,
                    if r.posted { "posted" } else { "pending" },
                    r.topic
                );
            }
            true
        }),
        Command::MarkPosted { topic } => CsvTracker::new(&cfg.tracker_path)
            .mark_as_posted(&topic)
            .map(|n| {
                info!(updated = n, "tracker updated");
                n > 0
            }),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = ?e, "command failed");
            ExitCode::FAILURE
        }
    }
}
