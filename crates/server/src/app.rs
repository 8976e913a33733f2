//! Router assembly and startup probes.

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing::Span;

use crate::db::{Backend, DocumentDb};
use crate::gate::AuthReadiness;
use crate::middleware::{create_session_layer, request_id_middleware, security_headers_middleware};
use crate::routes;
use crate::state::AppState;

/// Build the full application router.
///
/// Sessions are stored next to the documents: in `PostgreSQL` when the
/// document store runs there, in process memory otherwise. The Sentry
/// layers are added by the binary.
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(&state.config().static_dir))
        .layer(from_fn(security_headers_middleware));

    let router = match state.db().backend() {
        Backend::Postgres(pg) => router.layer(create_session_layer(
            PostgresStore::new(pg.pool().clone()),
            state.config(),
        )),
        Backend::Memory(_) => {
            router.layer(create_session_layer(MemoryStore::default(), state.config()))
        }
    };

    router
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Resolve the auth readiness barrier once the backend answers.
///
/// Page navigations wait on the barrier, so a backend that never comes up
/// turns every gated navigation into a home redirect instead of a hang.
pub async fn probe_auth_readiness(db: &DocumentDb, readiness: &AuthReadiness) {
    match db.ping().await {
        Ok(()) => {
            tracing::info!("Auth ready");
            readiness.mark_ready();
        }
        Err(e) => {
            tracing::error!(error = %e, "Auth backend unreachable");
            readiness.mark_failed(e.to_string());
        }
    }
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable until auth is ready and while the
/// backend is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    if !state.auth_ready().is_ready() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match state.db().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;

    fn app(readiness: AuthReadiness) -> Router {
        build_router(AppState::new(
            ServerConfig::default(),
            DocumentDb::in_memory(),
            readiness,
        ))
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(status_of(app(AuthReadiness::pending()), "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_follows_barrier() {
        let readiness = AuthReadiness::pending();
        let router = app(readiness.clone());
        assert_eq!(
            status_of(router.clone(), "/health/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        probe_auth_readiness(&DocumentDb::in_memory(), &readiness).await;
        assert_eq!(status_of(router, "/health/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let response = app(AuthReadiness::ready())
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_unknown_api_path_is_json_404() {
        assert_eq!(
            status_of(app(AuthReadiness::ready()), "/api/nope").await,
            StatusCode::NOT_FOUND
        );
    }
}
