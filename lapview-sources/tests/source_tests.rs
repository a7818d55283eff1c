//! Integration tests for the HTTP and file sources
//!
//! The HTTP tests serve canned responses from a throwaway local listener.

use lapview_core::{LapDataSource, SourceError};
use lapview_sources::{DemoSource, FileSource, HttpSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Helper: serve exactly one HTTP response and return the URL to request
async fn serve_once(status_line: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let _ = socket.read(&mut buf).await.unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    format!("http://{}/activity/session/7/gps_data", addr)
}

fn demo_json() -> String {
    serde_json::to_string(&DemoSource::new().with_laps(2).generate()).unwrap()
}

// ==================== HttpSource ====================

#[tokio::test]
async fn test_http_fetch_decodes_payload() {
    let url = serve_once("200 OK", demo_json()).await;
    let source = HttpSource::new(url.clone());
    assert_eq!(source.url(), url);
    assert_eq!(source.describe(), format!("GET {}", url));

    let payload = source.fetch().await.expect("fetch should succeed");
    assert_eq!(payload.laps.len(), 2);
    assert_eq!(payload.lap_times.len(), 2);
    assert!(payload.drivetrain().is_some());
}

#[tokio::test]
async fn test_http_non_ok_status_is_error() {
    let url = serve_once("404 Not Found", "{}".to_string()).await;
    let err = HttpSource::new(url).fetch().await.unwrap_err();
    assert!(matches!(err, SourceError::Status(404)), "got {:?}", err);
}

#[tokio::test]
async fn test_http_malformed_body_is_decode_error() {
    let url = serve_once("200 OK", "<html>oops</html>".to_string()).await;
    let err = HttpSource::new(url).fetch().await.unwrap_err();
    assert!(matches!(err, SourceError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_http_empty_payload_is_not_an_error() {
    let url = serve_once("200 OK", r#"{"laps": [], "lap_times": []}"#.to_string()).await;
    let payload = HttpSource::new(url).fetch().await.expect("empty payload still decodes");
    assert!(!payload.has_data());
}

#[tokio::test]
async fn test_http_connection_refused_is_request_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = HttpSource::new(format!("http://{}/gps_data", addr))
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Request(_)), "got {:?}", err);
}

// ==================== FileSource ====================

#[tokio::test]
async fn test_file_source_reads_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, demo_json()).unwrap();

    let source = FileSource::new(&path);
    assert!(source.describe().ends_with("session.json"));
    let payload = source.fetch().await.expect("file should load");
    assert_eq!(payload.laps.len(), 2);
}

#[tokio::test]
async fn test_file_source_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileSource::new(dir.path().join("missing.json"))
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Io(_)), "got {:?}", err);
}
