//! Page route table.

/// A page route the client application can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pattern: String,
    requires_auth: bool,
}

impl RouteDef {
    /// A route anyone may open.
    #[must_use]
    pub fn public(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: false,
        }
    }

    /// A route that needs a signed-in principal.
    #[must_use]
    pub fn protected(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: true,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub const fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Returns `true` if `path` matches this route.
    ///
    /// `{name}` matches exactly one non-empty segment. Trailing slashes are
    /// ignored on both sides.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let mut pattern = segments(&self.pattern);
        let mut actual = segments(path);
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return true,
                (Some(p), Some(a)) => {
                    let is_param = p.starts_with('{') && p.ends_with('}');
                    if !is_param && p != a {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The set of page routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
}

impl RouteTable {
    #[must_use]
    pub const fn new(routes: Vec<RouteDef>) -> Self {
        Self { routes }
    }

    /// The pages of the rating application.
    #[must_use]
    pub fn app_pages() -> Self {
        Self::new(vec![
            RouteDef::public("/"),
            RouteDef::public("/about"),
            RouteDef::public("/login"),
            RouteDef::public("/register"),
            RouteDef::public("/top-rated"),
            RouteDef::public("/verify-email"),
            RouteDef::protected("/rate"),
            RouteDef::protected("/rate/{id}"),
        ])
    }

    /// First route matching `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&RouteDef> {
        self.routes.iter().find(|r| r.matches(path))
    }

    #[must_use]
    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::app_pages()
    }
}
