//! # Crawl Orchestrator
//!
//! Walks the catalogue in two levels (listing pages, then item detail pages)
//! and drives extraction plus remote validation for every item.
//!
//! All fetch work draws from one shared semaphore. Permits are acquired
//! *before* a task is spawned and moved into it, so the configured limit
//! bounds the number of scheduled tasks, not just the requests themselves;
//! a listing page with hundreds of items cannot fan out past the limit.
//! A page task gives its permit back after its own fetch, before it starts
//! waiting on item permits; a page task that is only awaiting children
//! holds no slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::Html;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::crawling::parser_client::{ParseOutcome, ParserClient};
use crate::domain::book::RawBook;
use crate::infrastructure::config::CrawlerConfig;
use crate::infrastructure::html_parser::BookExtractor;
use crate::infrastructure::http_client::HttpClient;

/// Final tally of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CrawlReport {
    pub pages_total: u32,
    pub pages_failed: u64,
    pub items_discovered: u64,
    pub accepted: u64,
    pub rejected_invalid: u64,
    pub duplicates: u64,
    pub extraction_failures: u64,
    pub item_fetch_failures: u64,
    pub transport_failures: u64,
}

impl CrawlReport {
    /// True when the parser service was unreachable for the whole run: at
    /// least one record was submitted and not a single call got through.
    pub fn transport_wipeout(&self) -> bool {
        self.transport_failures > 0
            && self.accepted == 0
            && self.rejected_invalid == 0
            && self.duplicates == 0
    }
}

/// Live counters shared by all crawl tasks.
#[derive(Debug, Default)]
struct CrawlStats {
    pages_failed: AtomicU64,
    items_discovered: AtomicU64,
    accepted: AtomicU64,
    rejected_invalid: AtomicU64,
    duplicates: AtomicU64,
    extraction_failures: AtomicU64,
    item_fetch_failures: AtomicU64,
    transport_failures: AtomicU64,
}

impl CrawlStats {
    fn report(&self, pages_total: u32) -> CrawlReport {
        CrawlReport {
            pages_total,
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            items_discovered: self.items_discovered.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_invalid: self.rejected_invalid.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            item_fetch_failures: self.item_fetch_failures.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
        }
    }
}

/// Shared context moved into every crawl task.
struct CrawlContext {
    http: HttpClient,
    extractor: BookExtractor,
    client: ParserClient,
    limiter: Arc<Semaphore>,
    stats: CrawlStats,
}

/// Drives a full catalogue walk against the parser service.
pub struct CrawlOrchestrator {
    ctx: Arc<CrawlContext>,
    base_url: Url,
}

impl CrawlOrchestrator {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let http = HttpClient::new(config.http.clone())?;
        let client = ParserClient::new(
            &config.parser_host,
            Duration::from_secs(config.http.timeout_seconds),
        )?;

        Ok(Self {
            ctx: Arc::new(CrawlContext {
                http,
                extractor: BookExtractor::new(),
                client,
                limiter: Arc::new(Semaphore::new(config.concurrency)),
                stats: CrawlStats::default(),
            }),
            base_url: config.base_url.clone(),
        })
    }

    /// Run the crawl to completion and return the outcome tally.
    ///
    /// Per-item failures are logged and counted, never fatal. Only a failure
    /// to fetch the first catalogue page aborts the run, since nothing can
    /// be discovered without it.
    pub async fn run(&self) -> Result<CrawlReport> {
        let first_page = page_url(&self.base_url, 1)?;
        let body = {
            let _permit = self
                .ctx
                .limiter
                .acquire()
                .await
                .context("concurrency limiter closed")?;
            self.ctx
                .http
                .get_text(first_page.as_str())
                .await
                .context("failed to fetch the first catalogue page")?
        };

        let total_pages = {
            let doc = Html::parse_document(&body);
            self.ctx.extractor.extract_page_count(&doc)
        };
        info!(total_pages, base_url = %self.base_url, "starting catalogue walk");

        // The discovery fetch above only reads the pager; page 1 goes
        // through the same walk as every other page.
        let mut pages: Vec<JoinHandle<()>> = Vec::with_capacity(total_pages as usize);
        for page in 1..=total_pages {
            let url = page_url(&self.base_url, page)?;
            let permit = self
                .ctx
                .limiter
                .clone()
                .acquire_owned()
                .await
                .context("concurrency limiter closed")?;
            let ctx = self.ctx.clone();
            pages.push(tokio::spawn(process_page(ctx, url, permit)));
        }

        for handle in pages {
            if handle.await.is_err() {
                warn!("listing page task panicked");
            }
        }

        let report = self.ctx.stats.report(total_pages);
        info!(
            accepted = report.accepted,
            rejected_invalid = report.rejected_invalid,
            duplicates = report.duplicates,
            extraction_failures = report.extraction_failures,
            item_fetch_failures = report.item_fetch_failures,
            transport_failures = report.transport_failures,
            "crawl complete; all records handled by parser service"
        );
        Ok(report)
    }
}

/// Fetch one listing page, then fan its items out under the limiter.
async fn process_page(ctx: Arc<CrawlContext>, page_url: Url, permit: OwnedSemaphorePermit) {
    let body = match ctx.http.get_text(page_url.as_str()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %page_url, error = %e, "listing page fetch failed");
            ctx.stats.pages_failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    // Free the slot before waiting on item permits
    drop(permit);

    let links = {
        let doc = Html::parse_document(&body);
        match ctx.extractor.extract_item_links(&doc, &page_url) {
            Ok(links) => links,
            Err(e) => {
                warn!(url = %page_url, error = %e, "listing page parse failed");
                ctx.stats.pages_failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    };
    if links.is_empty() {
        debug!(url = %page_url, "no item links on listing page");
        return;
    }

    let mut items: Vec<JoinHandle<()>> = Vec::with_capacity(links.len());
    for link in links {
        ctx.stats.items_discovered.fetch_add(1, Ordering::Relaxed);
        let permit = match ctx.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };
        let ctx = ctx.clone();
        items.push(tokio::spawn(async move {
            let _permit = permit;
            process_item(ctx, link).await;
        }));
    }

    // Tasks are independent; a failed sibling never cancels the others
    for item in items {
        if item.await.is_err() {
            warn!("item task panicked");
        }
    }
}

/// Fetch one detail page, extract the raw record and submit it.
async fn process_item(ctx: Arc<CrawlContext>, url: Url) {
    let body = match ctx.http.get_text(url.as_str()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %url, error = %e, "item page fetch failed");
            ctx.stats.item_fetch_failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let raw = {
        let doc = Html::parse_document(&body);
        ctx.extractor.extract_book(&doc, url.as_str())
    };
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            warn!(url = %url, error = %e, "record extraction failed");
            ctx.stats.extraction_failures.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    submit_record(&ctx, &url, &raw).await;
}

async fn submit_record(ctx: &CrawlContext, url: &Url, raw: &RawBook) {
    match ctx.client.parse_book(raw).await {
        Ok(ParseOutcome::Accepted(book)) => {
            info!(upc = %book.upc, name = %book.name, "parser stored record");
            ctx.stats.accepted.fetch_add(1, Ordering::Relaxed);
        }
        Ok(ParseOutcome::RejectedInvalid(detail)) => {
            // Already logged in detail by the parser service
            debug!(url = %url, detail = %detail, "record rejected as invalid");
            ctx.stats.rejected_invalid.fetch_add(1, Ordering::Relaxed);
        }
        Ok(ParseOutcome::RejectedDuplicate(detail)) => {
            debug!(url = %url, detail = %detail, "duplicate record skipped");
            ctx.stats.duplicates.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            error!(url = %url, error = %e, "parser service call failed");
            ctx.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Catalogue page address: the first page is the site index, later pages
/// live under `catalogue/page-N.html`.
fn page_url(base: &Url, page: u32) -> Result<Url> {
    let path = if page == 1 {
        "index.html".to_string()
    } else {
        format!("catalogue/page-{page}.html")
    };
    base.join(&path)
        .with_context(|| format!("cannot build URL for catalogue page {page}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_follow_the_catalogue_scheme() {
        let base = Url::parse("https://books.toscrape.com/").unwrap();
        assert_eq!(
            page_url(&base, 1).unwrap().as_str(),
            "https://books.toscrape.com/index.html"
        );
        assert_eq!(
            page_url(&base, 2).unwrap().as_str(),
            "https://books.toscrape.com/catalogue/page-2.html"
        );
        assert_eq!(
            page_url(&base, 50).unwrap().as_str(),
            "https://books.toscrape.com/catalogue/page-50.html"
        );
    }

    #[test]
    fn transport_wipeout_requires_zero_service_responses() {
        let mut report = CrawlReport {
            items_discovered: 10,
            transport_failures: 10,
            ..Default::default()
        };
        assert!(report.transport_wipeout());

        // A single accepted record proves the service was reachable
        report.accepted = 1;
        assert!(!report.transport_wipeout());

        // So does a rejection, which is a service response too
        report.accepted = 0;
        report.rejected_invalid = 1;
        assert!(!report.transport_wipeout());
    }

    #[test]
    fn clean_run_is_not_a_wipeout() {
        let report = CrawlReport::default();
        assert!(!report.transport_wipeout());
    }

    #[test]
    fn stats_snapshot_copies_every_counter() {
        let stats = CrawlStats::default();
        stats.items_discovered.fetch_add(3, Ordering::Relaxed);
        stats.accepted.fetch_add(2, Ordering::Relaxed);
        stats.duplicates.fetch_add(1, Ordering::Relaxed);

        let report = stats.report(1);
        assert_eq!(report.pages_total, 1);
        assert_eq!(report.items_discovered, 3);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.transport_failures, 0);
    }
}
