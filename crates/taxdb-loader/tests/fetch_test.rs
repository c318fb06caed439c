//! Archive download over HTTP against a mock server

mod common;

use std::time::Duration;

use common::{init_test_tracing, zip_bytes, FailingTransport, MINIMAL_DUMP};
use taxdb_loader::ingest::{
    ArchiveFetcher, ArchiveTransport, HttpTransport, LocalDataInspector, TransportTimeouts,
};
use taxdb_loader::{FetchError, LoaderError};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn timeouts() -> TransportTimeouts {
    TransportTimeouts {
        connect: Duration::from_secs(5),
        read: Duration::from_secs(30),
    }
}

fn http_fetcher(server: &MockServer) -> ArchiveFetcher {
    let url = Url::parse(&format!("{}/pub/taxonomy/taxdmp.zip", server.uri())).unwrap();
    let transport = HttpTransport::new(timeouts()).unwrap();
    ArchiveFetcher::with_transport(url, Box::new(transport))
}

#[tokio::test]
async fn test_fetch_writes_and_expands_archive() {
    init_test_tracing();
    let server = MockServer::start().await;
    let archive = zip_bytes(MINIMAL_DUMP).unwrap();
    Mock::given(method("GET"))
        .and(path("/pub/taxonomy/taxdmp.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetched = http_fetcher(&server).fetch(dir.path()).await.unwrap();

    assert!(fetched);
    assert_eq!(std::fs::read(dir.path().join("taxdmp.zip")).unwrap(), archive);
    assert!(LocalDataInspector::missing_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_not_found_reports_failure_without_writing() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let fetched = http_fetcher(&server).fetch(dir.path()).await.unwrap();

    assert!(!fetched);
    assert!(!dir.path().join("taxdmp.zip").exists());
}

#[tokio::test]
async fn test_http_status_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/taxdmp.zip", server.uri())).unwrap();
    let err = HttpTransport::new(timeouts())
        .unwrap()
        .retrieve(&url)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Protocol { .. }));
    assert!(!err.is_transient());
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    let url = Url::parse("http://127.0.0.1:1/taxdmp.zip").unwrap();
    let err = HttpTransport::new(timeouts())
        .unwrap()
        .retrieve(&url)
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

#[tokio::test]
async fn test_transport_failure_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let fetcher = ArchiveFetcher::with_transport(common::source_url(), Box::new(FailingTransport));

    assert!(!fetcher.fetch(dir.path()).await.unwrap());
}

#[tokio::test]
async fn test_corrupt_download_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>maintenance</html>".to_vec()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = http_fetcher(&server).fetch(dir.path()).await.unwrap_err();

    assert!(matches!(err, LoaderError::Archive(_)));
}
