//! Remote validation client
//!
//! Submits extracted raw records to the parser service and maps the
//! response status into a local outcome. Validation and duplicate
//! rejections are ordinary outcomes; anything else on the wire is a
//! transport error the caller decides how to handle.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::book::{ParsedBook, RawBook};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("parser service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("parser service returned unexpected status {status}: {detail}")]
    UnexpectedStatus { status: StatusCode, detail: String },
}

/// Local outcome of one `ParseBook` call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// The service validated and persisted the record; the echo carries the
    /// typed fields.
    Accepted(ParsedBook),
    /// The service rejected the record as invalid.
    RejectedInvalid(String),
    /// The record's UPC was already persisted.
    RejectedDuplicate(String),
}

/// Client session to the parser service.
pub struct ParserClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ParserClient {
    /// Build a client for the given service host, e.g.
    /// `http://localhost:50051`.
    pub fn new(parser_host: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/parse-book", parser_host.trim_end_matches('/')),
        })
    }

    /// Submit one raw record for validation and storage.
    pub async fn parse_book(&self, raw: &RawBook) -> Result<ParseOutcome, TransportError> {
        let response = self.http.post(&self.endpoint).json(raw).send().await?;

        match response.status() {
            StatusCode::OK => Ok(ParseOutcome::Accepted(response.json().await?)),
            StatusCode::BAD_REQUEST => {
                Ok(ParseOutcome::RejectedInvalid(error_detail(response).await))
            }
            StatusCode::CONFLICT => {
                Ok(ParseOutcome::RejectedDuplicate(error_detail(response).await))
            }
            status => Err(TransportError::UnexpectedStatus {
                status,
                detail: error_detail(response).await,
            }),
        }
    }
}

/// Best-effort read of the `{"error": "..."}` envelope.
async fn error_detail(response: reqwest::Response) -> String {
    match response.json::<serde_json::Value>().await {
        Ok(body) => body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("<no detail>")
            .to_string(),
        Err(_) => "<no detail>".to_string(),
    }
}
