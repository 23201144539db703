//! Fetcher tests against a mock HTTP server.

use gatewall::config::ProviderConfig;
use gatewall::fetcher::{fallback_ranges, Fetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(name: &str, endpoints: Vec<String>) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        endpoints,
        cap: 50,
        enabled: true,
    }
}

const RANGE_DOC: &str = r#"{
    "creationTime": "2026-08-20T21:00:53.000000",
    "prefixes": [
        {"ipv4Prefix": "66.249.64.0/27"},
        {"ipv4Prefix": "66.249.64.32/27"},
        {"ipv6Prefix": "2001:4860:4801:10::/64"}
    ]
}"#;

#[tokio::test]
async fn test_fetch_provider_structured_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/googlebot.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RANGE_DOC))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    let outcome = fetcher
        .fetch_provider(&provider(
            "googlebot",
            vec![format!("{}/googlebot.json", server.uri())],
        ))
        .await;

    assert!(!outcome.degraded);
    assert_eq!(outcome.ranges.len(), 2);
    assert_eq!(outcome.endpoints_failed, 0);
}

#[tokio::test]
async fn test_fetch_provider_scan_fallback_on_odd_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ranges"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("# exported ranges\n157.55.16.0/22\n40.77.0.0/16\n"),
        )
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    let outcome = fetcher
        .fetch_provider(&provider("bingbot", vec![format!("{}/ranges", server.uri())]))
        .await;

    assert!(!outcome.degraded);
    assert_eq!(outcome.ranges.len(), 2);
}

#[tokio::test]
async fn test_all_endpoints_failing_triggers_hardcoded_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    let outcome = fetcher
        .fetch_provider(&provider(
            "googlebot",
            vec![
                format!("{}/a.json", server.uri()),
                format!("{}/b.json", server.uri()),
            ],
        ))
        .await;

    assert!(outcome.degraded);
    assert_eq!(outcome.endpoints_failed, 2);
    assert_eq!(outcome.ranges, fallback_ranges("googlebot"));
}

#[tokio::test]
async fn test_one_failing_endpoint_does_not_degrade() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RANGE_DOC))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    let outcome = fetcher
        .fetch_provider(&provider(
            "googlebot",
            vec![
                format!("{}/bad.json", server.uri()),
                format!("{}/good.json", server.uri()),
            ],
        ))
        .await;

    assert!(!outcome.degraded);
    assert_eq!(outcome.endpoints_failed, 1);
    assert_eq!(outcome.ranges.len(), 2);
}

#[tokio::test]
async fn test_unparseable_body_counts_as_endpoint_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    let outcome = fetcher
        .fetch_provider(&provider(
            "bingbot",
            vec![format!("{}/ranges", server.uri())],
        ))
        .await;

    assert!(outcome.degraded);
    assert_eq!(outcome.ranges, fallback_ranges("bingbot"));
}

#[tokio::test]
async fn test_raw_payload_lands_in_scratch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RANGE_DOC))
        .mount(&server)
        .await;

    let fetcher = Fetcher::new(5).unwrap();
    fetcher
        .fetch_provider(&provider(
            "googlebot",
            vec![format!("{}/googlebot.json", server.uri())],
        ))
        .await;

    assert!(fetcher.scratch_path().join("googlebot-0.payload").exists());
}
