//! End-to-end tests for the parser service RPC: status mapping, idempotence
//! and restart recovery across a real HTTP boundary.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use bookvault::crawling::{ParseOutcome, ParserClient, TransportError};
use bookvault::domain::book::RawBook;
use bookvault::infrastructure::book_store::BookStore;
use bookvault::service::server::{self, AppState};

const BASE: &str = "https://books.toscrape.com/";

/// Bind the service router on an ephemeral port over a store in `dir`.
async fn spawn_service(dir: &TempDir) -> String {
    let store = BookStore::open(&dir.path().join("books.jsonl"))
        .await
        .unwrap();
    let state = Arc::new(AppState {
        store,
        base_url: BASE.to_string(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(host: &str) -> ParserClient {
    ParserClient::new(host, Duration::from_secs(5)).unwrap()
}

fn raw_book() -> RawBook {
    RawBook {
        name: "Set Me Free".to_string(),
        upc: "ce6396b0f23f6ecc".to_string(),
        price_excl_tax: "17.46".to_string(),
        tax: "0.00".to_string(),
        availability: "In stock (19 available)".to_string(),
        url: "https://books.toscrape.com/catalogue/set-me-free_988/index.html".to_string(),
    }
}

#[tokio::test]
async fn accepted_record_is_echoed_with_typed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_service(&dir).await;

    let outcome = client(&host).parse_book(&raw_book()).await.unwrap();
    match outcome {
        ParseOutcome::Accepted(book) => {
            assert_eq!(book.name, "Set Me Free");
            assert_eq!(book.upc, "ce6396b0f23f6ecc");
            assert_eq!(book.price_excl_tax, 17.46);
            assert_eq!(book.tax, 0.0);
            assert_eq!(book.availability, 19);
            assert_eq!(
                book.url,
                "https://books.toscrape.com/catalogue/set-me-free_988/index.html"
            );
        }
        other => panic!("expected acceptance, got {other:?}"),
    }
}

#[tokio::test]
async fn resubmission_yields_duplicate_not_second_accept() {
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_service(&dir).await;
    let client = client(&host);

    let first = client.parse_book(&raw_book()).await.unwrap();
    assert!(matches!(first, ParseOutcome::Accepted(_)));

    let second = client.parse_book(&raw_book()).await.unwrap();
    assert!(matches!(second, ParseOutcome::RejectedDuplicate(_)));

    // Exactly one line made it to the durable log
    let contents = std::fs::read_to_string(dir.path().join("books.jsonl")).unwrap();
    assert_eq!(contents.lines().count(), 1);
}

#[tokio::test]
async fn invalid_record_is_rejected_with_detail() {
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_service(&dir).await;

    let raw = RawBook {
        name: String::new(),
        ..raw_book()
    };
    let outcome = client(&host).parse_book(&raw).await.unwrap();
    match outcome {
        ParseOutcome::RejectedInvalid(detail) => assert!(detail.contains("Name")),
        other => panic!("expected invalid rejection, got {other:?}"),
    }

    // Nothing was persisted
    let contents = std::fs::read_to_string(dir.path().join("books.jsonl")).unwrap();
    assert!(contents.is_empty());
}

#[tokio::test]
async fn unexpected_status_maps_to_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_service(&dir).await;

    // Point the client below an unrouted prefix so the call hits the fallback
    let client = client(&format!("{host}/api"));
    let err = client.parse_book(&raw_book()).await.unwrap_err();
    match err {
        TransportError::UnexpectedStatus { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Grab a port that is certainly closed afterwards
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client.parse_book(&raw_book()).await.unwrap_err();
    assert!(matches!(err, TransportError::Request(_)));
}

#[tokio::test]
async fn restart_rebuilds_dedup_state_from_the_log() {
    let dir = tempfile::tempdir().unwrap();

    let first_host = spawn_service(&dir).await;
    let first = client(&first_host).parse_book(&raw_book()).await.unwrap();
    assert!(matches!(first, ParseOutcome::Accepted(_)));

    // A second service instance over the same log must remember the UPC
    let second_host = spawn_service(&dir).await;
    let replay = client(&second_host).parse_book(&raw_book()).await.unwrap();
    assert!(matches!(replay, ParseOutcome::RejectedDuplicate(_)));
}

#[tokio::test]
async fn health_reports_record_count() {
    let dir = tempfile::tempdir().unwrap();
    let host = spawn_service(&dir).await;

    client(&host).parse_book(&raw_book()).await.unwrap();

    let body: serde_json::Value = reqwest::get(format!("{host}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["records"], 1);
}
