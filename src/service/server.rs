//! HTTP JSON API server for the parser service.
//!
//! Exposes the validation pipeline as a single RPC over `axum` + `tokio`:
//!
//! - POST /parse-book - validate, deduplicate and persist one raw record
//! - GET  /health     - server status and accepted record count
//!
//! Status mapping: 200 accepted, 400 invalid record, 409 duplicate UPC,
//! 500 storage failure. Error responses carry `{"error": message}`.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use crate::domain::book::RawBook;
use crate::infrastructure::book_store::BookStore;
use crate::infrastructure::config::ServiceConfig;
use crate::service::parse::{self, ParseRejection};

/// Shared state of the parser service.
pub struct AppState {
    pub store: BookStore,
    pub base_url: String,
}

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Map a pipeline rejection onto the RPC status code.
fn rejection_status(rejection: &ParseRejection) -> StatusCode {
    match rejection {
        ParseRejection::UnparseableAvailability { .. }
        | ParseRejection::UnparseableMoney { .. }
        | ParseRejection::Validation(_) => StatusCode::BAD_REQUEST,
        ParseRejection::Duplicate { .. } => StatusCode::CONFLICT,
        ParseRejection::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /parse-book
async fn handle_parse_book(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawBook>,
) -> Response {
    match parse::parse_book(&state.store, &state.base_url, &raw).await {
        Ok(book) => (StatusCode::OK, Json(book)).into_response(),
        Err(rejection) => json_error(rejection_status(&rejection), &rejection.to_string()),
    }
}

/// GET /health
async fn handle_health(State(state): State<Arc<AppState>>) -> Response {
    let response = serde_json::json!({
        "status": "ok",
        "records": state.store.len().await,
    });
    (StatusCode::OK, Json(response)).into_response()
}

/// Fallback handler for unmatched routes.
async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// Build the service router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/parse-book", post(handle_parse_book))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .with_state(state)
}

/// Bootstrap the store from the existing log, then serve until ctrl-c.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let store = BookStore::open(&config.output_file)
        .await
        .context("failed to open record store")?;
    let state = Arc::new(AppState {
        store,
        base_url: config.base_url.clone(),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        log = %config.output_file.display(),
        "parser service listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
