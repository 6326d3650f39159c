use ddns_bridge::{Config, SharedConfig, Updater};
use reqwest::StatusCode;
use serde_json::json;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORD_PATH: &str = "/domains/example.com/records/123";

struct TestServer {
    addr: SocketAddr,
    http: reqwest::Client,
}

impl TestServer {
    async fn start(provider: &MockServer, ledger_path: &Path, extra: &[(&str, &str)]) -> Self {
        let ledger = ledger_path.display().to_string();
        let provider_url = provider.uri();
        let mut vars = vec![
            ("TOKEN", "tok"),
            ("DOMAIN", "example.com"),
            ("RECORD_ID", "123"),
            ("DDNS_USERNAME", "ddns"),
            ("DDNS_PASSWORD", "hunter2"),
            ("DDNS_RATE_LIMIT", "0"),
            ("DDNS_LEDGER_PATH", ledger.as_str()),
            ("DDNS_PROVIDER_URL", provider_url.as_str()),
        ];
        vars.extend_from_slice(extra);
        let config: SharedConfig = Arc::new(
            Config::from_lookup(|key| {
                vars.iter()
                    .rev()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| (*v).to_string())
            })
            .unwrap(),
        );

        let ledger = config.ledger().await.unwrap();
        let propagator = config.propagator().unwrap();
        let updater = Arc::new(Updater::new(config.clone(), ledger, propagator));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ddns_bridge::api::from_tcp(listener, config, updater).unwrap();
        tokio::spawn(server);

        Self {
            addr,
            http: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> (StatusCode, String) {
        let response = self
            .http
            .get(format!("http://{}{path}", self.addr))
            .query(query)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }

    async fn update(&self, query: &[(&str, &str)]) -> (StatusCode, String) {
        self.get("/ddns/update", query).await
    }
}

fn valid_query(ip: &str) -> Vec<(&str, &str)> {
    vec![
        ("username", "ddns"),
        ("password", "hunter2"),
        ("hostname", "test-host"),
        ("ip", ip),
    ]
}

fn ledger_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

async fn accepting_provider(expected_calls: u64) -> MockServer {
    let provider = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RECORD_PATH))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "domain_record": {
                "id": 123, "type": "A", "name": "home", "data": "203.0.113.1", "ttl": 1800
            }
        })))
        .expect(expected_calls)
        .mount(&provider)
        .await;
    provider
}

#[tokio::test]
async fn update_then_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RECORD_PATH))
        .and(body_json(json!({ "data": "203.0.113.1" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&provider)
        .await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "DNS updated");
    let lines = ledger_lines(&ledger);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(",203.0.113.1"));

    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "IP unchanged");
    assert_eq!(ledger_lines(&ledger).len(), 1);
}

#[tokio::test]
async fn existing_ledger_tail_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    std::fs::write(&ledger, "2025-01-09 12:00:00.000000,203.0.113.1\n").unwrap();
    let provider = accepting_provider(0).await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "IP unchanged");
    assert_eq!(ledger_lines(&ledger).len(), 1);
}

#[tokio::test]
async fn myip_and_legacy_path() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(1).await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let query = [
        ("username", "ddns"),
        ("password", "hunter2"),
        ("hostname", "test-host"),
        ("myip", "203.0.113.1"),
    ];
    let (status, body) = server.get("/ap", &query).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "DNS updated");
}

#[tokio::test]
async fn basic_authorization_header() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(1).await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let response = server
        .http
        .get(format!("http://{}/ddns/update", server.addr))
        .basic_auth("ddns", Some("hunter2"))
        .query(&[("hostname", "test-host"), ("myip", "203.0.113.1")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "DNS updated");
}

#[tokio::test]
async fn missing_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(0).await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let full = valid_query("203.0.113.1");
    for skipped in 0..full.len() {
        let query: Vec<_> = full
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skipped)
            .map(|(_, kv)| *kv)
            .collect();
        let (status, body) = server.update(&query).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing parameters");
    }
    assert!(ledger_lines(&ledger).is_empty());
}

#[tokio::test]
async fn bad_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(0).await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    for (username, password) in [("ddns", "senha_errada"), ("root", "hunter2"), ("a", "b")] {
        let query = [
            ("username", username),
            ("password", password),
            ("hostname", "test-host"),
            ("ip", "203.0.113.1"),
        ];
        let (status, body) = server.update(&query).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, "Unauthorized");
    }
    assert!(ledger_lines(&ledger).is_empty());
}

#[tokio::test]
async fn invalid_hostname_and_address() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(0).await;
    let server =
        TestServer::start(&provider, &ledger, &[("DDNS_HOSTNAMES", "test-host")]).await;

    let mut query = valid_query("203.0.113.1");
    query[2] = ("hostname", "other-host");
    let (status, body) = server.update(&query).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid hostname: other-host");

    let (status, body) = server.update(&valid_query("203.0.113.999")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Invalid IP"));

    let (status, body) = server.update(&valid_query("192.168.0.10")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with("Invalid IP"));

    assert!(ledger_lines(&ledger).is_empty());
}

#[tokio::test]
async fn provider_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .expect(1)
        .mount(&provider)
        .await;
    let server = TestServer::start(&provider, &ledger, &[]).await;

    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to update DNS: invalid token");
    assert!(ledger_lines(&ledger).is_empty());
}

#[tokio::test]
async fn rate_limited_client() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(1).await;
    let server = TestServer::start(&provider, &ledger, &[("DDNS_RATE_LIMIT", "2")]).await;

    assert_eq!(server.update(&valid_query("203.0.113.1")).await.1, "DNS updated");
    assert_eq!(server.update(&valid_query("203.0.113.1")).await.1, "IP unchanged");
    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Too many requests");
}

#[tokio::test]
async fn health_check() {
    let dir = tempfile::tempdir().unwrap();
    let provider = accepting_provider(0).await;
    let server = TestServer::start(&provider, &dir.path().join("ips.log"), &[]).await;

    let (status, body) = server.get("/healthcheck", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap(),
        json!({"ok": "healthy"})
    );
}

#[tokio::test]
async fn unreachable_provider() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = accepting_provider(0).await;
    let closed = TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_url = format!("http://{}", closed.local_addr().unwrap());
    drop(closed);
    let server = TestServer::start(
        &provider,
        &ledger,
        &[("DDNS_PROVIDER_URL", closed_url.as_str())],
    )
    .await;

    let (status, body) = server.update(&valid_query("203.0.113.1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.starts_with("Error connecting to DigitalOcean API: "),
        "{body}"
    );
    assert!(ledger_lines(&ledger).is_empty());
}

#[tokio::test]
async fn queued_updates_behind_slow_provider() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ips.log");
    let provider = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(RECORD_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(1)))
        .expect(1)
        .mount(&provider)
        .await;
    // A 3s request timeout and a 2s provider timeout leave 500ms to wait for the ledger.
    let server = TestServer::start(
        &provider,
        &ledger,
        &[("DDNS_API_TIMEOUT", "3"), ("DDNS_PROVIDER_TIMEOUT", "2")],
    )
    .await;

    let addresses = ["203.0.113.1", "203.0.113.2", "203.0.113.3"];
    let queries: Vec<_> = addresses.iter().map(|ip| valid_query(ip)).collect();
    let (a, b, c) = tokio::join!(
        server.update(&queries[0]),
        server.update(&queries[1]),
        server.update(&queries[2]),
    );

    let mut updated = Vec::new();
    for (ip, (status, body)) in addresses.iter().zip([a, b, c]) {
        if status == StatusCode::OK {
            assert_eq!(body, "DNS updated");
            updated.push(*ip);
        } else {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, "Timed out waiting for a pending DNS update");
        }
    }
    assert_eq!(updated.len(), 1);
    let lines = ledger_lines(&ledger);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(&format!(",{}", updated[0])));
}
