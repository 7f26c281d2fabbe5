//! Integration tests against a real server on an ephemeral port.
//!
//! Each test boots the site with its own configuration, serves it with peer
//! addresses attached (as `main` does), and talks to it over TCP with
//! `reqwest`. Redirects are never followed so that `301`s can be inspected.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode, redirect};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use request_pipeline::{Config, build_router};

/// A running server and a client pointed at it.
struct TestServer {
    addr: SocketAddr,
    client: Client,
}

impl TestServer {
    async fn start(config: Config) -> Self {
        let app = build_router(Config {
            public_directory: "does-not-exist".into(),
            ..config
        })
        .expect("router builds");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        Self { addr, client }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[tokio::test]
async fn test_health_over_tcp() {
    let server = TestServer::start(Config::default()).await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["environment"], "development");
}

#[tokio::test]
async fn test_client_ip_from_peer_and_proxy_headers() {
    let server = TestServer::start(Config::default()).await;

    let body: Value = server
        .client
        .get(server.url("/api/whoami"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["ip"], "127.0.0.1");

    let body: Value = server
        .client
        .get(server.url("/api/whoami"))
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .header("accept", "application/json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["ip"], "198.51.100.4");
    assert_eq!(body["data"]["ajax"], true);
}

#[tokio::test]
async fn test_post_echo_roundtrip() {
    let server = TestServer::start(Config::default()).await;

    let response = server
        .client
        .post(server.url("/api/echo"))
        .json(&json!({ "message": "over the wire" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["message"], "over the wire");
    assert_eq!(body["data"]["length"], 13);
}

#[tokio::test]
async fn test_rate_limit_is_per_client() {
    let server = TestServer::start(Config {
        rate_limit_max_attempts: 1,
        rate_limit_window: Duration::from_secs(60),
        ..Config::default()
    })
    .await;

    let send = |ip: &'static str| {
        server
            .client
            .get(server.url("/health"))
            .header("x-real-ip", ip)
            .send()
    };

    assert_eq!(send("203.0.113.1").await.unwrap().status(), StatusCode::OK);
    let limited = send("203.0.113.1").await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    // A different client has its own budget
    assert_eq!(send("203.0.113.2").await.unwrap().status(), StatusCode::OK);
}

#[tokio::test]
async fn test_https_redirect_over_tcp() {
    let server = TestServer::start(Config {
        https_redirect: true,
        ..Config::default()
    })
    .await;

    let response = server
        .client
        .get(server.url("/api/echo?message=hi"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()["location"],
        format!("https://{}/api/echo?message=hi", server.addr).as_str()
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = TestServer::start(Config::default()).await;

    let response = server
        .client
        .delete(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
