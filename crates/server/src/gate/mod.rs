//! Navigation authorization gate.
//!
//! Decides, for each page navigation, whether the current principal may
//! open the requested page:
//!
//! 1. Wait for the identity provider's one-time readiness barrier.
//! 2. A protected target without a principal redirects to
//!    `/login?redirect=<original path>`.
//! 3. A target matching no page redirects to `/?redirect=<original path>`.
//! 4. Anything else is allowed.
//!
//! Internal errors (readiness failed, session unreadable) are logged and
//! turned into the home redirect, never into `Allow`. The gate never writes
//! to the session.

pub mod identity;
pub mod routes;

use std::fmt::Write as _;

pub use identity::{AuthReadiness, IdentityError, IdentityProvider, SessionIdentity};
pub use routes::{RouteDef, RouteTable};

/// Query parameter carrying the originally requested path.
pub const REDIRECT_PARAM: &str = "redirect";

/// Login page path.
pub const LOGIN_PATH: &str = "/login";

/// Home page path.
pub const HOME_PATH: &str = "/";

/// A requested page: path plus optional raw query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTarget {
    path: String,
    query: Option<String>,
}

impl NavigationTarget {
    #[must_use]
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
        }
    }

    /// Target from a request URI.
    #[must_use]
    pub fn from_uri(uri: &axum::http::Uri) -> Self {
        Self::new(uri.path(), uri.query().map(str::to_owned))
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path and query as requested.
    #[must_use]
    pub fn full_path(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// The full path encoded for use as a single query parameter value.
    ///
    /// Path segments are percent-encoded one by one and rejoined with `/`, so
    /// plain paths survive verbatim. The query, if any, follows an encoded
    /// `?`.
    #[must_use]
    pub fn encoded_return_path(&self) -> String {
        let mut out = String::new();
        for segment in self.path.split('/') {
            if !out.is_empty() || self.path.starts_with('/') {
                out.push('/');
            }
            let decoded = urlencoding::decode(segment)
                .map_or_else(|_| segment.to_owned(), std::borrow::Cow::into_owned);
            out.push_str(&urlencoding::encode(&decoded));
        }
        // `split` yields a leading empty segment for absolute paths
        if self.path.starts_with('/') {
            out.remove(0);
        }
        if out.is_empty() {
            out.push('/');
        }
        if let Some(query) = &self.query {
            let _ = write!(out, "%3F{}", urlencoding::encode(query));
        }
        out
    }
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Open the requested page.
    Allow,
    /// Send the visitor to the login page, then back to `return_to`.
    RedirectToLogin { return_to: NavigationTarget },
    /// Send the visitor home, remembering `return_to`.
    RedirectHome { return_to: NavigationTarget },
}

impl GateDecision {
    /// Redirect location, or `None` for [`GateDecision::Allow`].
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { return_to } => Some(format!(
                "{LOGIN_PATH}?{REDIRECT_PARAM}={}",
                return_to.encoded_return_path()
            )),
            Self::RedirectHome { return_to } => Some(format!(
                "{HOME_PATH}?{REDIRECT_PARAM}={}",
                return_to.encoded_return_path()
            )),
        }
    }
}

/// The navigation gate: page table plus extra protected paths.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    routes: RouteTable,
    protected_paths: Vec<String>,
}

impl Gate {
    #[must_use]
    pub const fn new(routes: RouteTable, protected_paths: Vec<String>) -> Self {
        Self {
            routes,
            protected_paths,
        }
    }

    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns `true` if `path` needs a principal.
    #[must_use]
    pub fn requires_auth(&self, path: &str) -> bool {
        let listed = self
            .protected_paths
            .iter()
            .any(|p| p.trim_end_matches('/') == path.trim_end_matches('/'));
        listed || self.routes.resolve(path).is_some_and(RouteDef::requires_auth)
    }

    /// Decide whether the principal behind `identity` may open `target`.
    pub async fn authorize<I: IdentityProvider>(
        &self,
        target: &NavigationTarget,
        identity: &I,
    ) -> GateDecision {
        match self.check(target, identity).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(
                    path = %target.full_path(),
                    error = %e,
                    "Navigation guard error"
                );
                GateDecision::RedirectHome {
                    return_to: target.clone(),
                }
            }
        }
    }

    async fn check<I: IdentityProvider>(
        &self,
        target: &NavigationTarget,
        identity: &I,
    ) -> Result<GateDecision, IdentityError> {
        identity.ready().await?;

        if self.requires_auth(target.path()) && identity.current_principal().await?.is_none() {
            tracing::debug!(path = %target.path(), "Protected page without principal");
            return Ok(GateDecision::RedirectToLogin {
                return_to: target.clone(),
            });
        }

        if self.routes.resolve(target.path()).is_none() {
            tracing::debug!(path = %target.path(), "No page matches");
            return Ok(GateDecision::RedirectHome {
                return_to: target.clone(),
            });
        }

        Ok(GateDecision::Allow)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use scout_core::PrincipalId;

    use super::*;

    /// Identity with a fixed principal behind a shared readiness barrier.
    struct FakeIdentity {
        readiness: AuthReadiness,
        principal: Result<Option<PrincipalId>, IdentityError>,
    }

    impl FakeIdentity {
        fn ready_with(principal: Option<&str>) -> Self {
            Self {
                readiness: AuthReadiness::ready(),
                principal: Ok(principal.map(|p| PrincipalId::parse(p).unwrap())),
            }
        }
    }

    impl IdentityProvider for FakeIdentity {
        async fn ready(&self) -> Result<(), IdentityError> {
            self.readiness.wait().await
        }

        async fn current_principal(&self) -> Result<Option<PrincipalId>, IdentityError> {
            self.principal.clone()
        }
    }

    fn target(path: &str) -> NavigationTarget {
        NavigationTarget::new(path, None)
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    #[tokio::test]
    async fn test_protected_page_without_principal_waits_then_redirects_to_login() {
        let gate = Gate::default();
        let identity = FakeIdentity {
            readiness: AuthReadiness::pending(),
            principal: Ok(None),
        };
        let readiness = identity.readiness.clone();

        let resolve = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            readiness.mark_ready();
        });

        let decision = tokio::time::timeout(
            Duration::from_secs(2),
            gate.authorize(&target("/rate/123"), &identity),
        )
        .await
        .unwrap();
        resolve.await.unwrap();

        assert_eq!(
            decision.location().as_deref(),
            Some("/login?redirect=/rate/123")
        );
    }

    #[tokio::test]
    async fn test_protected_page_with_principal_is_allowed() {
        let gate = Gate::default();
        let identity = FakeIdentity::ready_with(Some("alice"));
        assert_eq!(
            gate.authorize(&target("/rate/123"), &identity).await,
            GateDecision::Allow
        );
    }

    #[tokio::test]
    async fn test_unknown_page_redirects_home() {
        let gate = Gate::default();
        let identity = FakeIdentity::ready_with(None);
        let decision = gate.authorize(&target("/nonexistent"), &identity).await;
        assert_eq!(
            decision.location().as_deref(),
            Some("/?redirect=/nonexistent")
        );
    }

    #[tokio::test]
    async fn test_public_page_is_allowed_anonymously() {
        let gate = Gate::default();
        let identity = FakeIdentity::ready_with(None);
        assert_eq!(
            gate.authorize(&target("/top-rated"), &identity).await,
            GateDecision::Allow
        );
    }

    #[tokio::test]
    async fn test_configured_protected_path() {
        let gate = Gate::new(RouteTable::app_pages(), vec!["/about".into()]);
        let identity = FakeIdentity::ready_with(None);
        let decision = gate.authorize(&target("/about/"), &identity).await;
        assert!(matches!(decision, GateDecision::RedirectToLogin { .. }));
    }

    #[tokio::test]
    async fn test_protected_unknown_path_prefers_login() {
        let gate = Gate::new(RouteTable::app_pages(), vec!["/secret".into()]);
        let identity = FakeIdentity::ready_with(None);
        let decision = gate.authorize(&target("/secret"), &identity).await;
        assert_eq!(
            decision.location().as_deref(),
            Some("/login?redirect=/secret")
        );
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[tokio::test]
    async fn test_readiness_failure_redirects_home() {
        let gate = Gate::default();
        let identity = FakeIdentity {
            readiness: AuthReadiness::pending(),
            principal: Ok(Some(PrincipalId::parse("alice").unwrap())),
        };
        identity.readiness.mark_failed("backend down");

        let decision = gate.authorize(&target("/rate/1"), &identity).await;
        assert_eq!(decision.location().as_deref(), Some("/?redirect=/rate/1"));
    }

    #[tokio::test]
    async fn test_session_failure_never_allows() {
        let gate = Gate::default();
        let identity = FakeIdentity {
            readiness: AuthReadiness::ready(),
            principal: Err(IdentityError::Session("corrupt".into())),
        };
        let decision = gate.authorize(&target("/rate"), &identity).await;
        assert!(matches!(decision, GateDecision::RedirectHome { .. }));
    }

    // =========================================================================
    // Return path encoding
    // =========================================================================

    #[test]
    fn test_return_path_keeps_query() {
        let t = NavigationTarget::new("/rate/9", Some("tab=reviews&x=1".into()));
        assert_eq!(t.full_path(), "/rate/9?tab=reviews&x=1");
        assert_eq!(t.encoded_return_path(), "/rate/9%3Ftab%3Dreviews%26x%3D1");
    }

    #[test]
    fn test_return_path_encodes_segments_once() {
        let t = NavigationTarget::new("/rate/a%20b", None);
        assert_eq!(t.encoded_return_path(), "/rate/a%20b");
        assert_eq!(target("/").encoded_return_path(), "/");
    }

    #[test]
    fn test_allow_has_no_location() {
        assert!(GateDecision::Allow.location().is_none());
    }
}
