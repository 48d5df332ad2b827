//! Bookvault - Book Catalogue Ingest Pipeline
//!
//! Two cooperating processes ingest a paginated book catalogue exactly once:
//! a bounded-concurrency crawler that discovers and extracts raw records from
//! product detail pages, and a parser service that validates, deduplicates
//! and persists them to an append-only JSONL log.

// Module declarations
pub mod crawling;
pub mod domain;
pub mod infrastructure;
pub mod service;
