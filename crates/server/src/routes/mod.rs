//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (JSON)
//! POST  /auth/login                      - Password login, sets session
//! POST  /auth/register                   - Create account, sets session
//! POST  /auth/logout                     - Clear session
//! GET   /auth/me                         - Current principal
//!
//! # Stores
//! GET   /api/stores                      - List stores
//! POST  /api/stores                      - Create store (auth)
//! GET   /api/stores/{id}                 - Store detail
//! PATCH /api/stores/{id}                 - Partial update (auth)
//! GET   /api/stores/{id}/ratings         - Ratings, newest first
//! POST  /api/stores/{id}/ratings         - Rate a store (auth)
//! GET   /api/stores/{id}/ratings/stream  - Live ratings (SSE)
//!
//! # Ratings
//! GET   /api/ratings/averages            - Average score per store
//! PATCH /api/ratings/{id}                - Partial update (auth, owner only)
//!
//! # Functions
//! POST  /api/functions/deleteUserData    - Delete the caller's ratings
//!
//! # Pages
//! GET   /*                               - Navigation gate, then client shell
//! ```

pub mod auth;
pub mod functions;
pub mod pages;
pub mod ratings;
pub mod stores;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/stores", get(stores::index).post(stores::create))
        .route("/stores/{id}", get(stores::show).patch(stores::update))
        .route(
            "/stores/{id}/ratings",
            get(ratings::for_store).post(ratings::create),
        )
        .route("/stores/{id}/ratings/stream", get(ratings::stream_for_store))
        .route("/ratings/averages", get(ratings::averages))
        .route("/ratings/{id}", patch(ratings::update))
        .route("/functions/deleteUserData", post(functions::delete_user_data))
        .fallback(pages::api_not_found)
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .fallback(pages::navigate)
}
