//! Crawler process: walks the book catalogue and submits every extracted
//! record to the parser service for validation and storage.

use anyhow::Result;
use tracing::info;

use bookvault::crawling::CrawlOrchestrator;
use bookvault::infrastructure::config::CrawlerConfig;
use bookvault::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = CrawlerConfig::from_env()?;
    info!(
        base_url = %config.base_url,
        parser_host = %config.parser_host,
        concurrency = config.concurrency,
        "🚀 starting catalogue crawl"
    );

    let orchestrator = CrawlOrchestrator::new(&config)?;
    let report = orchestrator.run().await?;

    info!(
        items = report.items_discovered,
        accepted = report.accepted,
        rejected_invalid = report.rejected_invalid,
        duplicates = report.duplicates,
        "crawl finished"
    );

    if report.transport_wipeout() {
        anyhow::bail!(
            "parser service unreachable: all {} submissions failed in transport",
            report.transport_failures
        );
    }
    Ok(())
}
