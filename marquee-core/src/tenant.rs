//! Core multi-tenant types for Marquee.

use std::fmt;

use crate::errors::MarqueeError;

/// A tenant identifier: a lowercase slug such as `maria` or `rikuy`.
///
/// The slug doubles as the route prefix (`/maria`) under which the
/// tenant's pages are mounted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a slug, rejecting anything that could not appear as a single
    /// path segment.
    pub fn parse(raw: &str) -> Result<Self, MarqueeError> {
        let slug = raw.trim();
        if slug.is_empty() {
            return Err(MarqueeError::bad_request("tenant id must not be empty"));
        }
        let valid = slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(MarqueeError::bad_request(format!(
                "invalid tenant id '{slug}': expected lowercase letters, digits, '-' or '_'"
            )));
        }
        Ok(Self(slug.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Route prefix for this tenant, e.g. `/maria`.
    pub fn prefix(&self) -> String {
        format!("/{}", self.0)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which input selected the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantSource {
    /// Production hostname in the host table.
    Host,
    /// `?domain=` override on a development host.
    Query,
    /// Persisted preference cookie on a development host.
    Cookie,
    /// Unknown hostname, designated fallback tenant.
    Fallback,
}

impl TenantSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantSource::Host => "host",
            TenantSource::Query => "query",
            TenantSource::Cookie => "cookie",
            TenantSource::Fallback => "fallback",
        }
    }
}

/// Why no tenant was attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unresolved {
    /// The path is a global root route (`/admin`, `/api`, ...).
    RootRoute,
    /// Bare `/` on a development host: the tenant picker is shown.
    DevLanding,
    /// Development host without a valid query or cookie override.
    NoOverride,
    /// Unknown hostname and no fallback tenant configured.
    NoFallback,
}

impl Unresolved {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unresolved::RootRoute => "root route",
            Unresolved::DevLanding => "dev landing",
            Unresolved::NoOverride => "no override",
            Unresolved::NoFallback => "no fallback",
        }
    }
}

/// The single tenant decision attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantTag {
    Resolved { tenant: TenantId, source: TenantSource },
    None(Unresolved),
}

impl TenantTag {
    pub fn resolved(tenant: TenantId, source: TenantSource) -> Self {
        TenantTag::Resolved { tenant, source }
    }

    pub fn tenant(&self) -> Option<&TenantId> {
        match self {
            TenantTag::Resolved { tenant, .. } => Some(tenant),
            TenantTag::None(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TenantTag::Resolved { .. })
    }

    /// Short label used in logs and the `x-debug-domain` header.
    pub fn label(&self) -> String {
        match self {
            TenantTag::Resolved { tenant, .. } => tenant.to_string(),
            TenantTag::None(reason) => format!("none ({})", reason.as_str()),
        }
    }
}
