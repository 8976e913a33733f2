//! Page navigation.
//!
//! Every path that is not an API route is a page of the client application.
//! The navigation gate decides whether to serve the client shell or redirect.

use axum::{
    extract::State,
    http::{Method, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, Result};
use crate::gate::{NavigationTarget, SessionIdentity};
use crate::state::AppState;

/// Client shell served for allowed pages.
const INDEX_FILE: &str = "index.html";

/// Fallback for every unrouted path: run the gate, then serve the shell.
pub async fn navigate(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    session: Session,
) -> Result<Response> {
    if method != Method::GET && method != Method::HEAD {
        return Err(AppError::NotFound(format!("no route for {method} {}", uri.path())));
    }

    let target = NavigationTarget::from_uri(&uri);
    let identity = SessionIdentity::new(state.auth_ready(), &session);
    let decision = state.gate().authorize(&target, &identity).await;

    match decision.location() {
        Some(location) => {
            tracing::debug!(path = %target.full_path(), %location, "Navigation redirected");
            Ok(Redirect::to(&location).into_response())
        }
        None => shell(&state).await.map(IntoResponse::into_response),
    }
}

/// Fallback for unknown API paths: JSON 404 instead of a page redirect.
pub async fn api_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("no API route for {}", uri.path()))
}

async fn shell(state: &AppState) -> Result<Html<String>> {
    let path = state.config().static_dir.join(INDEX_FILE);
    tokio::fs::read_to_string(&path)
        .await
        .map(Html)
        .map_err(|e| AppError::Internal(format!("failed to read {}: {e}", path.display())))
}
