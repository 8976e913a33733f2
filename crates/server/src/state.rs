//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::DocumentDb;
use crate::gate::{AuthReadiness, Gate, RouteTable};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// document store handle, the navigation gate and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    db: DocumentDb,
    gate: Gate,
    auth_ready: AuthReadiness,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `db` - Document store handle
    /// * `auth_ready` - Barrier resolved once sessions can be read
    #[must_use]
    pub fn new(config: ServerConfig, db: DocumentDb, auth_ready: AuthReadiness) -> Self {
        let gate = Gate::new(RouteTable::app_pages(), config.protected_paths.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                gate,
                auth_ready,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the document store handle.
    #[must_use]
    pub fn db(&self) -> &DocumentDb {
        &self.inner.db
    }

    /// Get a reference to the navigation gate.
    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.inner.gate
    }

    /// Get a reference to the auth readiness barrier.
    #[must_use]
    pub fn auth_ready(&self) -> &AuthReadiness {
        &self.inner.auth_ready
    }
}
