//! Tenant path rewriting.
//!
//! A rewrite substitutes `/{tenant}{path}` for route matching without
//! changing the visible URL. Root routes are never rewritten and an
//! already-prefixed path is left alone, so rewriting twice is the same as
//! rewriting once.

use crate::errors::MarqueeError;
use crate::registry::split_list;
use crate::tenant::TenantId;

/// Global path prefixes that exist once for the whole deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRoutes(Vec<String>);

impl Default for RootRoutes {
    fn default() -> Self {
        Self(
            ["/auth", "/create", "/api", "/admin"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

impl RootRoutes {
    pub fn new<I, S>(routes: I) -> Result<Self, MarqueeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let routes = routes
            .into_iter()
            .map(|r| {
                let r = r.into();
                let trimmed = normalize_path(r.trim()).to_string();
                if !trimmed.starts_with('/') || trimmed == "/" {
                    return Err(MarqueeError::bad_request(format!(
                        "invalid root route '{r}': expected an absolute prefix like /admin"
                    )));
                }
                Ok(trimmed)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(routes))
    }

    /// Parse the comma separated `routes.root` key.
    pub fn parse(spec: &str) -> Result<Self, MarqueeError> {
        Self::new(split_list(spec))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Exact match or below one of the routes, after trailing-slash
    /// normalization.
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.0.iter().any(|route| is_under(path, route))
    }
}

/// Strip one trailing slash, except for the bare root.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// `path == prefix` or `path` starts with `prefix/`.
pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// The path/search/hash triple a rewrite operates on.
#[derive(Debug, Clone, Copy)]
pub struct RouteTarget<'a> {
    pub path: &'a str,
    /// `?query` including the question mark, or empty.
    pub search: &'a str,
    /// `#fragment` including the hash, or empty.
    pub hash: &'a str,
}

impl<'a> RouteTarget<'a> {
    pub fn path(path: &'a str) -> Self {
        Self {
            path,
            search: "",
            hash: "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Unchanged,
    /// Full replacement: prefixed path followed by the original search
    /// and hash.
    To(String),
}

impl Rewrite {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Rewrite::To(_))
    }

    /// The path component of the result (without search and hash).
    pub fn effective_path<'a>(&'a self, original: &'a str) -> &'a str {
        match self {
            Rewrite::Unchanged => original,
            Rewrite::To(uri) => uri.split(['?', '#']).next().unwrap_or(uri),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathRewriter {
    root_routes: RootRoutes,
}

impl PathRewriter {
    pub fn new(root_routes: RootRoutes) -> Self {
        Self { root_routes }
    }

    pub fn root_routes(&self) -> &RootRoutes {
        &self.root_routes
    }

    pub fn rewrite(&self, target: RouteTarget<'_>, tenant: Option<&TenantId>) -> Rewrite {
        if self.root_routes.contains(target.path) {
            return Rewrite::Unchanged;
        }
        let Some(tenant) = tenant else {
            return Rewrite::Unchanged;
        };

        let prefix = tenant.prefix();
        if is_under(normalize_path(target.path), &prefix) {
            return Rewrite::Unchanged;
        }

        let path = if target.path == "/" { "" } else { target.path };
        Rewrite::To(format!("{prefix}{path}{}{}", target.search, target.hash))
    }

    /// Apply to a full `path?query#fragment` string. Convenience for
    /// callers holding a URL rather than its parts.
    pub fn rewrite_uri(&self, uri: &str, tenant: Option<&TenantId>) -> String {
        let (before_hash, hash) = match uri.find('#') {
            Some(i) => uri.split_at(i),
            None => (uri, ""),
        };
        let (path, search) = match before_hash.find('?') {
            Some(i) => before_hash.split_at(i),
            None => (before_hash, ""),
        };
        match self.rewrite(RouteTarget { path, search, hash }, tenant) {
            Rewrite::Unchanged => uri.to_string(),
            Rewrite::To(out) => out,
        }
    }
}
