//! Fetcher retry behavior against a mock server
//!
//! Backoff delays are shrunk to milliseconds so the retry sequence can be
//! observed without slowing the suite down.

use post_harvest::crawler::{FetchResult, Fetcher, RetryPolicy};
use post_harvest::CrawlError;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial_delay: Duration::from_millis(5),
        multiplier: 1.5,
        max_delay: None,
    }
}

fn fetcher() -> Fetcher {
    Fetcher::with_client(reqwest::Client::new(), fast_policy())
}

fn assert_close(actual: Duration, expected_micros: u64) {
    let expected = Duration::from_micros(expected_micros);
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff < Duration::from_micros(1),
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_rate_limit_backs_off_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/page", server.uri()))
        .await
        .unwrap();

    let FetchResult::Success(page) = result else {
        panic!("expected success");
    };
    assert_eq!(page.body, "<html>ok</html>");
    assert_eq!(page.backoff.len(), 2);
    assert_close(page.backoff[0], 5_000);
    assert_close(page.backoff[1], 7_500);
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_server_error_retries_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("back"))
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri()).await.unwrap();

    let FetchResult::Success(page) = result else {
        panic!("expected success");
    };
    assert_eq!(page.body, "back");
    assert_eq!(page.backoff.len(), 1);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_not_found_is_skipped_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/gone", server.uri()))
        .await
        .unwrap();

    assert!(matches!(result, FetchResult::Skipped { status_code: 404 }));
}

#[tokio::test]
async fn test_forbidden_is_skipped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri()).await.unwrap();
    assert!(matches!(result, FetchResult::Skipped { status_code: 403 }));
}

#[tokio::test]
async fn test_unexpected_status_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher().fetch(&server.uri()).await;
    assert!(matches!(
        result,
        Err(CrawlError::UnexpectedStatus { status: 204, .. })
    ));
}

#[tokio::test]
async fn test_timeout_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(250))
        .build()
        .unwrap();
    let result = Fetcher::with_client(client, fast_policy())
        .fetch(&server.uri())
        .await
        .unwrap();

    let FetchResult::Success(page) = result else {
        panic!("expected success");
    };
    assert_eq!(page.body, "fast");
    assert_eq!(page.backoff.len(), 1);
}

#[tokio::test]
async fn test_connection_refused_is_fatal() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = fetcher()
        .fetch(&format!("http://127.0.0.1:{}/", port))
        .await;
    assert!(matches!(result, Err(CrawlError::Http { .. })));
}
