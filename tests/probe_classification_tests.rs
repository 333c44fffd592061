//! Integration tests for probing endpoints and classifying real HTTP responses.
//!
//! Each test mounts a wiremock server that answers with a fixed status, then
//! checks the outcome, status code and error category of one probe.

use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shop_loadtest::classifier::{Classifier, NotFoundPolicy, Outcome, RateLimitPolicy};
use shop_loadtest::errors::ErrorCategory;
use shop_loadtest::probe::probe;
use shop_loadtest::task::Task;

const PRODUCTS: &str = "/product-service/api/products";
const ORDER: &str = "/order-service/api/orders/1";

fn catalog(rate_limit: RateLimitPolicy) -> Task {
    Task::new(
        "GET /products",
        3,
        PRODUCTS,
        Classifier::CatalogBrowse { rate_limit },
    )
}

fn order(rate_limit: RateLimitPolicy) -> Task {
    Task::new(
        "GET /orders/{id}",
        1,
        ORDER,
        Classifier::OrderLookup {
            not_found: NotFoundPolicy::TreatAsSuccess,
            rate_limit,
        },
    )
}

async fn server_answering(route: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
async fn catalog_ok_is_success() {
    let server = server_answering(PRODUCTS, 200).await;

    let record = probe(&client(), &server.uri(), &catalog(RateLimitPolicy::TreatAsFailure)).await;

    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.status_code, Some(200));
    assert_eq!(record.error_category, None);
    assert_eq!(record.task, "GET /products");
    assert_eq!(record.endpoint, PRODUCTS);
}

#[tokio::test]
async fn catalog_not_found_is_failure() {
    let server = server_answering(PRODUCTS, 404).await;

    let record = probe(&client(), &server.uri(), &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    let reason = record.outcome.reason().expect("404 on catalog must fail");
    assert!(reason.contains("not found"), "reason was: {}", reason);
    assert_eq!(record.error_category, Some(ErrorCategory::ClientError));
}

#[tokio::test]
async fn catalog_service_unavailable_reports_code() {
    let server = server_answering(PRODUCTS, 503).await;

    let record = probe(&client(), &server.uri(), &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    let reason = record.outcome.reason().expect("503 must fail");
    assert!(reason.contains("Server error"), "reason was: {}", reason);
    assert!(reason.contains("503"), "reason was: {}", reason);
    assert_eq!(record.error_category, Some(ErrorCategory::ServerError));
}

#[tokio::test]
async fn rate_limited_catalog_follows_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let lenient = probe(&client(), &server.uri(), &catalog(RateLimitPolicy::TreatAsSuccess)).await;
    assert!(lenient.is_success());
    assert_eq!(lenient.status_code, Some(429));

    let strict = probe(&client(), &server.uri(), &catalog(RateLimitPolicy::TreatAsFailure)).await;
    let reason = strict.outcome.reason().expect("strict 429 must fail");
    assert!(reason.contains("Rate Limit"), "reason was: {}", reason);
}

#[tokio::test]
async fn order_not_found_is_expected() {
    let server = server_answering(ORDER, 404).await;

    let record = probe(&client(), &server.uri(), &order(RateLimitPolicy::TreatAsFailure)).await;

    assert!(record.is_success());
    assert_eq!(record.status_code, Some(404));
    assert_eq!(record.error_category, None);
}

#[tokio::test]
async fn order_rate_limited_strict_is_failure() {
    let server = server_answering(ORDER, 429).await;

    let record = probe(&client(), &server.uri(), &order(RateLimitPolicy::TreatAsFailure)).await;

    assert_eq!(
        record.outcome,
        Outcome::Failure("Rate Limit: too many requests (429)".to_string())
    );
}

#[tokio::test]
async fn health_check_failure_reason() {
    let server = server_answering("/product-service/actuator/health", 503).await;
    let task = Task::new(
        "health_check",
        1,
        "/product-service/actuator/health",
        Classifier::HealthCheck,
    );

    let record = probe(&client(), &server.uri(), &task).await;

    assert_eq!(
        record.outcome,
        Outcome::Failure("Health check failed with status 503".to_string())
    );
}

#[tokio::test]
async fn base_url_trailing_slash_is_tolerated() {
    let server = server_answering(PRODUCTS, 200).await;
    let base = format!("{}/", server.uri());

    let record = probe(&client(), &base, &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    assert!(record.is_success());
}

#[tokio::test]
async fn connection_refused_yields_single_failure() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base = format!("http://127.0.0.1:{}", port);

    let record = probe(&client(), &base, &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    assert!(!record.is_success());
    assert_eq!(record.status_code, None);
    assert_eq!(record.error_category, Some(ErrorCategory::NetworkError));
    let reason = record.outcome.reason().unwrap();
    assert!(!reason.is_empty());
}

#[tokio::test]
async fn timeout_is_failure_with_timeout_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let record = probe(&client, &server.uri(), &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    assert!(!record.is_success());
    assert_eq!(record.error_category, Some(ErrorCategory::TimeoutError));
    assert!(record.latency < Duration::from_secs(2));
}

#[tokio::test]
async fn truncated_body_is_still_classified_by_status() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises 100 bytes, sends 5, then closes.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nhello")
            .await;
        let _ = socket.shutdown().await;
    });

    let base = format!("http://{}", addr);
    let record = probe(&client(), &base, &catalog(RateLimitPolicy::TreatAsSuccess)).await;

    assert_eq!(record.status_code, Some(200));
    assert!(record.is_success());
}
