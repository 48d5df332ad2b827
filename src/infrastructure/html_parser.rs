//! HTML parsing and data extraction for the book catalogue
//!
//! Specialized extractors for the three page shapes the crawler sees:
//! the pagination marker on the first catalogue page, item links on listing
//! pages, and the raw book record on product detail pages.

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::book::RawBook;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("required field '{field}' not found in page")]
    MissingField { field: &'static str },

    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// CSS selectors for catalogue data extraction
#[derive(Debug, Clone)]
pub struct BookExtractorConfig {
    /// Selector for the book title on a detail page
    pub product_name: String,
    /// Selector for the product information table rows
    pub info_table_row: String,
    /// Selector for item detail links on a listing page
    pub item_link: String,
    /// Selector for the pagination marker ("Page X of N")
    pub pagination_current: String,
}

impl Default for BookExtractorConfig {
    fn default() -> Self {
        Self {
            product_name: "div.product_main h1".to_string(),
            info_table_row: "table.table-striped tr".to_string(),
            item_link: "article.product_pod h3 a".to_string(),
            pagination_current: "li.current".to_string(),
        }
    }
}

/// Data extractor for catalogue pages
pub struct BookExtractor {
    config: BookExtractorConfig,
}

impl BookExtractor {
    /// Create a new extractor with the default selector set
    pub fn new() -> Self {
        Self::with_config(BookExtractorConfig::default())
    }

    /// Create a new extractor with a custom selector set
    pub fn with_config(config: BookExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract the raw book record from a product detail page.
    ///
    /// Currency signs are stripped from the price fields; everything else is
    /// passed through as found for the parser service to validate.
    pub fn extract_book(&self, html: &Html, url: &str) -> Result<RawBook, ExtractionError> {
        let name_selector = parse_selector(&self.config.product_name)?;
        let name = html
            .select(&name_selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(ExtractionError::MissingField { field: "name" })?;

        let row_selector = parse_selector(&self.config.info_table_row)?;
        let th_selector = parse_selector("th")?;
        let td_selector = parse_selector("td")?;

        let mut rows = Vec::new();
        for row in html.select(&row_selector) {
            let header = row
                .select(&th_selector)
                .next()
                .map(|th| th.text().collect::<String>().trim().to_string());
            let value = row
                .select(&td_selector)
                .next()
                .map(|td| td.text().collect::<String>().trim().to_string());
            if let (Some(header), Some(value)) = (header, value) {
                rows.push((header, value));
            }
        }
        let lookup = |field: &'static str| -> Result<&str, ExtractionError> {
            rows.iter()
                .find(|(header, _)| header.as_str() == field)
                .map(|(_, value)| value.as_str())
                .ok_or(ExtractionError::MissingField { field })
        };

        let book = RawBook {
            name,
            upc: lookup("UPC")?.to_string(),
            price_excl_tax: strip_currency(lookup("Price (excl. tax)")?),
            tax: strip_currency(lookup("Tax")?),
            availability: lookup("Availability")?.to_string(),
            url: url.to_string(),
        };

        debug!(upc = %book.upc, "extracted raw book record");
        Ok(book)
    }

    /// Extract item detail links from a listing page, resolved against the
    /// page's own URL.
    pub fn extract_item_links(
        &self,
        html: &Html,
        page_url: &Url,
    ) -> Result<Vec<Url>, ExtractionError> {
        let link_selector = parse_selector(&self.config.item_link)?;

        let links: Vec<Url> = html
            .select(&link_selector)
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| page_url.join(href).ok())
            .collect();

        debug!("Extracted {} item links", links.len());
        Ok(links)
    }

    /// Parse the total page count from the pagination marker.
    ///
    /// The marker reads "Page X of N"; a page without a parseable marker is
    /// treated as page 1 of 1.
    pub fn extract_page_count(&self, html: &Html) -> u32 {
        let Ok(selector) = parse_selector(&self.config.pagination_current) else {
            return 1;
        };

        html.select(&selector)
            .next()
            .map(|element| element.text().collect::<String>())
            .and_then(|text| {
                text.split_whitespace()
                    .last()
                    .and_then(|token| token.parse::<u32>().ok())
            })
            .unwrap_or(1)
    }
}

impl Default for BookExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn strip_currency(value: &str) -> String {
    value.trim().trim_start_matches('£').to_string()
}
