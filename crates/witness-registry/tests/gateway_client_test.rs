//! # Integration tests for the ledger gateway client
//!
//! Runs [`HttpRegistryClient`] against wiremock servers to check request
//! construction, confirmation polling, and the classification of every
//! failure mode into rejected, ambiguous, or unavailable.

use std::time::Duration;

use serde_json::json;
use witness_core::{ContentId, Record, RegistryId, ReportMetadata, SubmissionToken};
use witness_registry::{HttpRegistryClient, RegistryClient, RegistryError, RegistryHttpConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record() -> Record {
    Record::new(
        ReportMetadata {
            category: "theft".into(),
            subcategory: "bicycle".into(),
            occurred_date: "2024-01-05".into(),
            occurred_time: "14:30".into(),
            reporter_name: "A. Citizen".into(),
            nearest_facility: "Central Station".into(),
            reporter_address: "12 Main St".into(),
        },
        ContentId::digest(b"document"),
        ContentId::digest(b"identity"),
        SubmissionToken::from_key("tok-1").unwrap(),
    )
}

fn config(server: &MockServer) -> RegistryHttpConfig {
    let mut cfg = RegistryHttpConfig::local(&server.uri()).unwrap();
    cfg.poll_interval = Duration::from_millis(20);
    cfg.commit_timeout = Duration::from_millis(500);
    cfg
}

fn client(server: &MockServer) -> HttpRegistryClient {
    HttpRegistryClient::new(config(server)).unwrap()
}

async fn mount_submit(server: &MockServer, tx_hash: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "txHash": tx_hash })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn commit_sends_record_and_waits_for_confirmation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .and(body_partial_json(json!({
            "record": { "category": "theft", "submissionToken": "tok-1" }
        })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "txHash": "0xaa" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xaa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xaa", "status": "pending", "confirmations": 0
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xaa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xaa", "status": "confirmed", "confirmations": 1, "reportId": "7"
        })))
        .mount(&server)
        .await;

    let id = client(&server).commit(&record()).await.unwrap();
    assert_eq!(id, RegistryId(7));
}

#[tokio::test]
async fn commit_waits_for_required_depth() {
    let server = MockServer::start().await;
    mount_submit(&server, "0xbb").await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xbb", "status": "confirmed", "confirmations": 1, "reportId": 3
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xbb", "status": "confirmed", "confirmations": 3, "reportId": 3
        })))
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.confirmations = 3;
    let id = HttpRegistryClient::new(cfg)
        .unwrap()
        .commit(&record())
        .await
        .unwrap();
    assert_eq!(id, RegistryId(3));
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/by-token/tok-1"))
        .and(header("Authorization", "Bearer gateway-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reportId": "4" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.api_token = Some(zeroize::Zeroizing::new("gateway-secret".into()));
    let found = HttpRegistryClient::new(cfg)
        .unwrap()
        .find_by_token(&SubmissionToken::from_key("tok-1").unwrap())
        .await
        .unwrap();
    assert_eq!(found, Some(RegistryId(4)));
}

#[tokio::test]
async fn failed_transaction_is_a_rejection() {
    let server = MockServer::start().await;
    mount_submit(&server, "0xcc").await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xcc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xcc", "status": "failed", "reason": "execution reverted"
        })))
        .mount(&server)
        .await;

    match client(&server).commit(&record()).await {
        Err(RegistryError::SubmissionRejected { reason }) => {
            assert_eq!(reason, "execution reverted");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn client_error_on_submit_is_a_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "error": "bad record" })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).commit(&record()).await,
        Err(RegistryError::SubmissionRejected { .. })
    ));
}

#[tokio::test]
async fn server_error_on_submit_is_ambiguous_and_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(ResponseTemplate::new(500).set_body_string("node crashed"))
        .expect(1)
        .mount(&server)
        .await;

    match client(&server).commit(&record()).await {
        Err(RegistryError::SubmissionTimedOut { tx_hash, .. }) => assert!(tx_hash.is_none()),
        other => panic!("expected ambiguous outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn conflict_on_submit_reports_existing_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({ "reportId": "12" })))
        .expect(1)
        .mount(&server)
        .await;

    match client(&server).commit(&record()).await {
        Err(RegistryError::DuplicateSubmission { existing }) => {
            assert_eq!(existing, RegistryId(12));
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
}

#[tokio::test]
async fn confirmation_deadline_is_ambiguous_with_tx_hash() {
    let server = MockServer::start().await;
    mount_submit(&server, "0xdd").await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xdd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xdd", "status": "pending", "confirmations": 0
        })))
        .mount(&server)
        .await;

    match client(&server).commit(&record()).await {
        Err(RegistryError::SubmissionTimedOut { tx_hash, .. }) => {
            assert_eq!(tx_hash.as_deref(), Some("0xdd"));
        }
        other => panic!("expected ambiguous outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_submit_is_ambiguous() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({ "txHash": "0xee" }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.request_timeout = Duration::from_millis(100);
    let err = HttpRegistryClient::new(cfg)
        .unwrap()
        .commit(&record())
        .await
        .unwrap_err();
    assert!(err.is_ambiguous(), "got {err:?}");
}

#[tokio::test]
async fn unreachable_gateway_is_unavailable() {
    let cfg = RegistryHttpConfig::local("http://127.0.0.1:1").unwrap();
    let err = HttpRegistryClient::new(cfg)
        .unwrap()
        .commit(&record())
        .await
        .unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

#[tokio::test]
async fn fetch_decodes_committed_record() {
    let server = MockServer::start().await;
    let rec = record();

    Mock::given(method("GET"))
        .and(path("/v1/reports/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "registryId": "5",
            "record": rec,
            "committedAt": "2026-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let committed = client(&server).fetch(RegistryId(5)).await.unwrap();
    assert_eq!(committed.registry_id, RegistryId(5));
    assert_eq!(committed.record, rec);
}

#[tokio::test]
async fn fetch_missing_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/99"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert!(matches!(
        client(&server).fetch(RegistryId(99)).await,
        Err(RegistryError::NotFound(RegistryId(99)))
    ));
}

#[tokio::test]
async fn reads_retry_through_gateway_unavailability() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/by-token/tok-1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/by-token/tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reportId": 8 })))
        .mount(&server)
        .await;

    let found = client(&server)
        .find_by_token(&SubmissionToken::from_key("tok-1").unwrap())
        .await
        .unwrap();
    assert_eq!(found, Some(RegistryId(8)));
}

#[tokio::test]
async fn unknown_token_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/by-token/tok-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let found = client(&server)
        .find_by_token(&SubmissionToken::from_key("tok-1").unwrap())
        .await
        .unwrap();
    assert_eq!(found, None);
}

#[tokio::test]
async fn token_lookup_waits_for_writing_transaction_depth() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/reports/by-token/tok-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "reportId": "4", "txHash": "0xbb" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xbb", "status": "confirmed", "confirmations": 1, "reportId": "4"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xbb", "status": "confirmed", "confirmations": 3, "reportId": "4"
        })))
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.confirmations = 3;
    let client = HttpRegistryClient::new(cfg).unwrap();
    let token = SubmissionToken::from_key("tok-1").unwrap();

    assert_eq!(client.find_by_token(&token).await.unwrap(), None);
    assert_eq!(client.find_by_token(&token).await.unwrap(), Some(RegistryId(4)));
}

#[tokio::test]
async fn conflict_with_shallow_transaction_is_ambiguous() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/reports"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "reportId": "12", "txHash": "0xcc" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/0xcc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "txHash": "0xcc", "status": "pending", "confirmations": 0
        })))
        .mount(&server)
        .await;

    match client(&server).commit(&record()).await {
        Err(RegistryError::SubmissionTimedOut { tx_hash, .. }) => {
            assert_eq!(tx_hash.as_deref(), Some("0xcc"));
        }
        other => panic!("expected ambiguous, got {other:?}"),
    }
}

#[tokio::test]
async fn health_check_reflects_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    client(&server).check().await.unwrap();
}
