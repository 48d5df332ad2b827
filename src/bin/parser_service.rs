//! Parser service process: receives raw records from the crawler, validates
//! and deduplicates them, and appends accepted records to the durable log.

use anyhow::Result;

use bookvault::infrastructure::config::ServiceConfig;
use bookvault::infrastructure::logging::init_logging;
use bookvault::service::server;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = ServiceConfig::from_env()?;
    server::serve(config).await
}
