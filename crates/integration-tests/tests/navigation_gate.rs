//! Integration tests for the page navigation gate.

use std::time::Duration;

use reqwest::StatusCode;
use scout_integration_tests::TestApp;
use scout_server::config::ServerConfig;
use scout_server::gate::AuthReadiness;

fn location(resp: &reqwest::Response) -> &str {
    resp.headers()["location"]
        .to_str()
        .expect("Location is not ASCII")
}

// ============================================================================
// Redirects
// ============================================================================

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let app = TestApp::spawn().await;
    let resp = TestApp::client()
        .get(app.url("/rate/123"))
        .send()
        .await
        .expect("Request failed");

    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/login?redirect=/rate/123");
}

#[tokio::test]
async fn test_unknown_page_redirects_home() {
    let app = TestApp::spawn().await;
    let resp = TestApp::client()
        .get(app.url("/nonexistent"))
        .send()
        .await
        .expect("Request failed");

    assert!(resp.status().is_redirection());
    assert_eq!(location(&resp), "/?redirect=/nonexistent");
}

#[tokio::test]
async fn test_redirect_keeps_query() {
    let app = TestApp::spawn().await;
    let resp = TestApp::client()
        .get(app.url("/rate?store=abc"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(location(&resp), "/login?redirect=/rate%3Fstore%3Dabc");
}

#[tokio::test]
async fn test_configured_path_is_protected() {
    let config = ServerConfig {
        protected_paths: vec!["/top-rated".to_owned()],
        ..ServerConfig::default()
    };
    let app = TestApp::spawn_with(config, AuthReadiness::ready()).await;
    let resp = TestApp::client()
        .get(app.url("/top-rated"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(location(&resp), "/login?redirect=/top-rated");
}

// ============================================================================
// Allowed pages
// ============================================================================

#[tokio::test]
async fn test_public_page_serves_shell() {
    let app = TestApp::spawn().await;
    let resp = TestApp::client()
        .get(app.url("/about"))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Invalid body");
    assert!(body.contains(r#"<div id="app">"#));
}

#[tokio::test]
async fn test_signed_in_user_opens_protected_page() {
    let app = TestApp::spawn().await;
    let (client, _) = app.signed_in("gate@example.com").await;

    let resp = client
        .get(app.url("/rate/123"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_closes_protected_pages() {
    let app = TestApp::spawn().await;
    let (client, _) = app.signed_in("leaving@example.com").await;

    let resp = client
        .post(app.url("/auth/logout"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(app.url("/rate"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(location(&resp), "/login?redirect=/rate");
}

// ============================================================================
// Readiness
// ============================================================================

#[tokio::test]
async fn test_navigation_waits_for_auth_ready() {
    let app = TestApp::spawn_with(ServerConfig::default(), AuthReadiness::pending()).await;
    let url = app.url("/rate/123");
    let pending = tokio::spawn(async move { TestApp::client().get(url).send().await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    app.auth_ready.mark_ready();
    let resp = pending
        .await
        .expect("Request task panicked")
        .expect("Request failed");
    assert_eq!(location(&resp), "/login?redirect=/rate/123");
}

#[tokio::test]
async fn test_failed_auth_redirects_home() {
    let readiness = AuthReadiness::pending();
    readiness.mark_failed("backend unreachable");
    let app = TestApp::spawn_with(ServerConfig::default(), readiness).await;

    let resp = TestApp::client()
        .get(app.url("/about"))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(location(&resp), "/?redirect=/about");
}
