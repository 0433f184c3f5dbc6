//! Integration tests for RestMirrorClient using wiremock.

use std::time::Duration;

use sunalert_history::{HistoryRecord, MirrorError, RemoteMirror, RestMirrorClient};
use wiremock::matchers::{body_bytes, body_partial_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMESTAMP: i64 = 1_760_850_000_000;

fn record(photo_ref: &str) -> HistoryRecord {
    HistoryRecord {
        id: 12,
        timestamp: TIMESTAMP,
        latitude: -6.2,
        longitude: 106.8,
        address: "Jl. Sudirman, Jakarta".to_string(),
        uv_index: 6.2,
        risk_category: "High risk".to_string(),
        advice: "Reduce outdoor activity".to_string(),
        photo_ref: photo_ref.to_string(),
        note: Some("hazy".to_string()),
        synced: false,
    }
}

fn client_for(server: &MockServer) -> RestMirrorClient {
    RestMirrorClient::new(&server.uri(), None, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_publish_without_photo_writes_document_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path_regex(r"^/objects/.*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .and(body_partial_json(serde_json::json!({
            "timestamp": TIMESTAMP,
            "latitude": -6.2,
            "longitude": 106.8,
            "address": "Jl. Sudirman, Jakarta",
            "uvIndex": 6.2,
            "riskCategory": "High risk",
            "advice": "Reduce outdoor activity",
            "photoUrl": "",
            "note": "hazy"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.publish(&record("")).await.unwrap();
}

#[tokio::test]
async fn test_publish_uploads_photo_then_document() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("sky.jpg");
    std::fs::write(&photo, b"\xFF\xD8fake-jpeg").unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("/objects/history/12_{}.jpg", TIMESTAMP)))
        .and(header("content-type", "image/jpeg"))
        .and(body_bytes(b"\xFF\xD8fake-jpeg".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://cdn.example.com/history/12.jpg"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .and(body_partial_json(serde_json::json!({
            "photoUrl": "https://cdn.example.com/history/12.jpg"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let photo_ref = format!("file://{}", photo.display());
    client.publish(&record(&photo_ref)).await.unwrap();
}

#[tokio::test]
async fn test_photo_url_falls_back_to_object_url() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("sky.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    Mock::given(method("PUT"))
        .and(path_regex(r"^/objects/history/.*"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let expected_url = format!("{}/objects/history/12_{}.jpg", mock_server.uri(), TIMESTAMP);
    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .and(body_partial_json(serde_json::json!({ "photoUrl": expected_url })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.publish(&record(&photo.display().to_string())).await.unwrap();
}

#[tokio::test]
async fn test_publish_twice_overwrites_same_paths() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("sky.jpg");
    std::fs::write(&photo, b"jpeg").unwrap();

    Mock::given(method("PUT"))
        .and(path(format!("/objects/history/12_{}.jpg", TIMESTAMP)))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let rec = record(&photo.display().to_string());

    let first = client.publish(&rec).await;
    let second = client.publish(&rec).await;
    assert!(first.is_ok());
    assert!(second.is_ok());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.method.as_str() == "PUT"));
}

#[tokio::test]
async fn test_document_rejection_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.publish(&record("")).await.unwrap_err();

    match &err {
        MirrorError::Rejected { status, message } => {
            assert_eq!(*status, 503);
            assert_eq!(message, "unavailable");
        }
        other => panic!("Expected Rejected, got {:?}", other),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_missing_photo_fails_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client
        .publish(&record("/definitely/not/here.jpg"))
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::Photo { .. }));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/documents/history/12"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RestMirrorClient::new(
        &mock_server.uri(),
        Some("secret-token".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    client.publish(&record("")).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_document_is_ok() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/documents/history/12"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.delete(12).await.unwrap();
}

#[tokio::test]
async fn test_delete_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/documents/history/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client.delete(7).await.unwrap();
}

#[tokio::test]
async fn test_delete_server_error_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/documents/history/7"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.delete(7).await;
    assert!(matches!(result, Err(MirrorError::Rejected { status: 500, .. })));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    // Port 9 (discard) is not listening in test environments
    let client =
        RestMirrorClient::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
    let err = client.publish(&record("")).await.unwrap_err();

    assert!(matches!(err, MirrorError::Network(_)));
    assert!(err.is_transient());
}
