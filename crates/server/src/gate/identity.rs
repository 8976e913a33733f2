//! Identity provider seam and the auth readiness barrier.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tower_sessions::Session;

use scout_core::PrincipalId;

use crate::models::{CurrentPrincipal, session_keys};

/// Errors raised while resolving the current principal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The identity backend failed its initial resolution.
    #[error("identity provider failed to initialize: {0}")]
    NotReady(String),

    /// The readiness signal was dropped before it resolved.
    #[error("identity provider shut down before becoming ready")]
    Abandoned,

    /// The session could not be read.
    #[error("session unavailable: {0}")]
    Session(String),
}

/// Source of the current principal.
pub trait IdentityProvider {
    /// Resolves once the provider has finished its initial resolution.
    fn ready(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;

    /// The signed-in principal, if any.
    fn current_principal(
        &self,
    ) -> impl Future<Output = Result<Option<PrincipalId>, IdentityError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

/// One-time "auth ready" barrier.
///
/// Starts pending and resolves exactly once, to ready or failed. Waiters
/// registered before resolution wake when it happens; later waiters return
/// immediately. Clones share the barrier.
#[derive(Debug, Clone)]
pub struct AuthReadiness {
    tx: Arc<watch::Sender<Readiness>>,
}

impl AuthReadiness {
    /// A barrier that has not resolved yet.
    #[must_use]
    pub fn pending() -> Self {
        let (tx, _) = watch::channel(Readiness::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// A barrier that is already resolved.
    #[must_use]
    pub fn ready() -> Self {
        let barrier = Self::pending();
        barrier.mark_ready();
        barrier
    }

    /// Resolve the barrier as ready. No-op if already resolved.
    pub fn mark_ready(&self) {
        self.resolve(Readiness::Ready);
    }

    /// Resolve the barrier as failed. No-op if already resolved.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        self.resolve(Readiness::Failed(reason.into()));
    }

    /// Returns `true` once the barrier resolved as ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.tx.borrow() == Readiness::Ready
    }

    /// Wait until the barrier resolves.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotReady` if it resolved as failed.
    pub async fn wait(&self) -> Result<(), IdentityError> {
        let mut rx = self.tx.subscribe();
        let state = rx
            .wait_for(|s| *s != Readiness::Pending)
            .await
            .map_err(|_| IdentityError::Abandoned)?;
        match &*state {
            Readiness::Failed(reason) => Err(IdentityError::NotReady(reason.clone())),
            Readiness::Ready | Readiness::Pending => Ok(()),
        }
    }

    fn resolve(&self, next: Readiness) {
        self.tx.send_if_modified(|state| {
            if *state == Readiness::Pending {
                *state = next;
                true
            } else {
                false
            }
        });
    }
}

/// Identity of one request: the readiness barrier plus its session.
pub struct SessionIdentity<'a> {
    readiness: &'a AuthReadiness,
    session: &'a Session,
}

impl<'a> SessionIdentity<'a> {
    #[must_use]
    pub const fn new(readiness: &'a AuthReadiness, session: &'a Session) -> Self {
        Self { readiness, session }
    }
}

impl IdentityProvider for SessionIdentity<'_> {
    async fn ready(&self) -> Result<(), IdentityError> {
        self.readiness.wait().await
    }

    async fn current_principal(&self) -> Result<Option<PrincipalId>, IdentityError> {
        let current: Option<CurrentPrincipal> = self
            .session
            .get(session_keys::CURRENT_PRINCIPAL)
            .await
            .map_err(|e| IdentityError::Session(e.to_string()))?;
        Ok(current.map(|c| c.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_waiters_block_until_ready() {
        let barrier = AuthReadiness::pending();
        let waiter = {
            let barrier = barrier.clone();
            tokio::spawn(async move { barrier.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        barrier.mark_ready();
        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
        assert!(barrier.is_ready());
    }

    #[tokio::test]
    async fn test_failure_is_reported_to_every_waiter() {
        let barrier = AuthReadiness::pending();
        barrier.mark_failed("store unreachable");
        assert_eq!(
            barrier.wait().await,
            Err(IdentityError::NotReady("store unreachable".into()))
        );
        assert!(barrier.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_resolves_only_once() {
        let barrier = AuthReadiness::ready();
        barrier.mark_failed("too late");
        assert!(barrier.wait().await.is_ok());
    }
}
