//! Integration tests for Scout.
//!
//! Each test spawns the full router on an ephemeral port over the in-memory
//! document store and drives it with a cookie-aware HTTP client, so no
//! database or running server is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p scout-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `navigation_gate` - Page redirects for protected and unknown paths
//! - `delete_user_data` - Account data deletion endpoint
//! - `stores_and_ratings` - Store and rating API, ownership, live updates

use std::net::SocketAddr;
use std::path::PathBuf;

use reqwest::{Client, StatusCode, redirect};
use serde_json::{Value, json};

use scout_server::app::build_router;
use scout_server::config::ServerConfig;
use scout_server::db::DocumentDb;
use scout_server::gate::AuthReadiness;
use scout_server::state::AppState;

/// A running server plus handles into its state.
pub struct TestApp {
    pub addr: SocketAddr,
    pub db: DocumentDb,
    pub auth_ready: AuthReadiness,
}

impl TestApp {
    /// Spawn a server whose auth is already ready.
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::default(), AuthReadiness::ready()).await
    }

    /// Spawn a server with custom configuration and readiness barrier.
    pub async fn spawn_with(config: ServerConfig, auth_ready: AuthReadiness) -> Self {
        let config = ServerConfig {
            static_dir: static_dir(),
            ..config
        };
        let db = DocumentDb::in_memory();
        let app = build_router(AppState::new(config, db.clone(), auth_ready.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            addr,
            db,
            auth_ready,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A fresh client with its own cookie jar that does not follow redirects.
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register `email` and return a signed-in client plus the principal id.
    pub async fn signed_in(&self, email: &str) -> (Client, String) {
        let client = Self::client();
        let resp = client
            .post(self.url("/auth/register"))
            .json(&json!({ "email": email, "password": "correct horse battery" }))
            .send()
            .await
            .expect("Failed to register");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = resp.json().await.expect("Invalid register response");
        let user_id = body["userId"]
            .as_str()
            .expect("Register response without userId")
            .to_owned();
        (client, user_id)
    }

    /// Create a store and return its id.
    pub async fn create_store(&self, client: &Client, name: &str) -> String {
        let resp = client
            .post(self.url("/api/stores"))
            .json(&json!({
                "name": name,
                "address": "1 Main Street",
                "location": { "latitude": 47.37, "longitude": 8.54 },
            }))
            .send()
            .await
            .expect("Failed to create store");
        assert_eq!(resp.status(), StatusCode::CREATED);
        created_id(resp).await
    }

    /// Rate a store and return the rating id.
    pub async fn rate(&self, client: &Client, store_id: &str, score: f64) -> String {
        let resp = client
            .post(self.url(&format!("/api/stores/{store_id}/ratings")))
            .json(&json!({ "rating": score, "review": "crispy" }))
            .send()
            .await
            .expect("Failed to create rating");
        assert_eq!(resp.status(), StatusCode::CREATED);
        created_id(resp).await
    }

    /// Ratings of a store as returned by the API.
    pub async fn ratings_for(&self, store_id: &str) -> Vec<Value> {
        Self::client()
            .get(self.url(&format!("/api/stores/{store_id}/ratings")))
            .send()
            .await
            .expect("Failed to list ratings")
            .json()
            .await
            .expect("Invalid ratings response")
    }
}

async fn created_id(resp: reqwest::Response) -> String {
    let body: Value = resp.json().await.expect("Invalid create response");
    body["id"]
        .as_str()
        .expect("Create response without id")
        .to_owned()
}

fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../server/static")
}
