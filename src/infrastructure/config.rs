//! Configuration infrastructure
//!
//! Both processes read their configuration from environment variables once
//! at startup. Values are immutable for the process lifetime; invalid values
//! abort startup rather than being silently replaced.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use url::Url;

use crate::infrastructure::http_client::HttpClientConfig;

pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_PARSER_HOST: &str = "http://localhost:50051";
pub const DEFAULT_PARSER_BIND: &str = "0.0.0.0:50051";
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// File name of the durable record log inside `OUTPUT_DIR`.
pub const OUTPUT_FILE_NAME: &str = "books.jsonl";

/// Configuration for the crawler process.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Root of the catalogue; item URLs live under it.
    pub base_url: Url,
    /// Endpoint of the parser service, scheme included.
    pub parser_host: String,
    /// Upper bound on concurrently scheduled fetch tasks.
    pub concurrency: usize,
    /// Settings for the underlying HTTP client.
    pub http: HttpClientConfig,
}

impl CrawlerConfig {
    /// Read the crawler configuration from `BASE_URL`, `PARSER_HOST` and
    /// `CONCURRENCY`.
    pub fn from_env() -> Result<Self> {
        let base_url = Url::parse(&env_or("BASE_URL", DEFAULT_BASE_URL))
            .context("BASE_URL is not a valid URL")?;
        let concurrency: usize = env_or("CONCURRENCY", &DEFAULT_CONCURRENCY.to_string())
            .parse()
            .context("CONCURRENCY must be an integer")?;
        if concurrency == 0 {
            bail!("CONCURRENCY must be at least 1");
        }

        Ok(Self {
            base_url,
            parser_host: env_or("PARSER_HOST", DEFAULT_PARSER_HOST),
            concurrency,
            http: HttpClientConfig::default(),
        })
    }
}

/// Configuration for the parser service process.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL accepted records must be prefixed by.
    pub base_url: String,
    /// Listen address of the RPC server.
    pub bind_addr: SocketAddr,
    /// Path of the append-only record log.
    pub output_file: PathBuf,
}

impl ServiceConfig {
    /// Read the service configuration from `BASE_URL`, `PARSER_BIND` and
    /// `OUTPUT_DIR`.
    pub fn from_env() -> Result<Self> {
        let bind_addr: SocketAddr = env_or("PARSER_BIND", DEFAULT_PARSER_BIND)
            .parse()
            .context("PARSER_BIND must be a socket address like 0.0.0.0:50051")?;
        let output_file =
            PathBuf::from(env_or("OUTPUT_DIR", DEFAULT_OUTPUT_DIR)).join(OUTPUT_FILE_NAME);

        Ok(Self {
            base_url: env_or("BASE_URL", DEFAULT_BASE_URL),
            bind_addr,
            output_file,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}
