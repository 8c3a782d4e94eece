use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use clio::config::Config;
use clio::db::Database;
use clio::fetch;
use clio::llm::ChatCompletionClient;
use clio::logging::configure_logging;
use clio::workers::BatchProcessor;

#[derive(Parser)]
#[command(name = "clio", version, about = "News ingestion and enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch configured feeds and store new raw articles
    Fetch,
    /// Enrich stored articles that have not been published yet
    Enrich {
        /// Maximum number of articles to enrich in this run
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Fetch feeds, then enrich everything pending
    Run {
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let cli = Cli::parse();
    let config = Config::from_env();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
        }
        info!("Shutdown requested, letting in-flight items finish");
        let _ = cancel_tx.send(true);
    });

    let db = Database::new(&config.database_path).await?;

    match cli.command {
        Command::Fetch => {
            run_fetch(&db, &config).await?;
        }
        Command::Enrich { limit } => {
            run_enrich(&db, &config, limit, cancel_rx).await?;
        }
        Command::Run { limit } => {
            run_fetch(&db, &config).await?;
            run_enrich(&db, &config, limit, cancel_rx).await?;
        }
    }

    db.close().await;
    Ok(())
}

async fn run_fetch(db: &Database, config: &Config) -> Result<()> {
    if config.feed_urls.is_empty() {
        warn!("No feed URLs configured (FEED_URLS), nothing to fetch");
        return Ok(());
    }

    let client = fetch::create_http_client()?;
    let articles = fetch::fetch_sources(&client, config).await;
    info!("Fetched {} candidate articles", articles.len());

    let stats = fetch::ingest(db, &articles).await;
    info!(
        "Stored articles: {} new, {} refreshed, {} unchanged, {} failed",
        stats.inserted, stats.updated, stats.unchanged, stats.failed
    );
    Ok(())
}

async fn run_enrich(
    db: &Database,
    config: &Config,
    limit: i64,
    cancel: watch::Receiver<bool>,
) -> Result<()> {
    let pending = db.unenriched(limit).await?;
    if pending.is_empty() {
        info!("No articles pending enrichment");
        return Ok(());
    }

    info!("Enriching {} pending articles", pending.len());
    let provider = ChatCompletionClient::new(config)?;
    let processor = BatchProcessor::new(db.clone(), provider, config);
    let report = processor.run(pending, cancel).await;

    info!(
        "Enrichment run finished: {} processed, {} published, {} failed, {} skipped",
        report.processed, report.published, report.failed, report.skipped
    );
    for failure in &report.failures {
        warn!(
            "{} failed after {} attempts: {}",
            failure.url, failure.attempts, failure.reason
        );
    }
    Ok(())
}
