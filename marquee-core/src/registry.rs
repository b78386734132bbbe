use std::collections::{BTreeSet, HashMap};

use crate::errors::MarqueeError;
use crate::tenant::TenantId;

/// Static host-to-tenant table plus the set of tenants that may be picked
/// through a development override.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    hosts: HashMap<String, TenantId>,
    known: BTreeSet<TenantId>,
    fallback: Option<TenantId>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a production hostname to a tenant. The host is normalized, so
    /// registering `www.example.se` and `example.se` is the same entry.
    pub fn register_host<S>(&mut self, host: S, tenant: TenantId)
    where
        S: AsRef<str>,
    {
        self.known.insert(tenant.clone());
        self.hosts.insert(normalize_host(host.as_ref()), tenant);
    }

    /// Make a tenant selectable by override without giving it a hostname.
    pub fn register_tenant(&mut self, tenant: TenantId) {
        self.known.insert(tenant);
    }

    pub fn set_fallback(&mut self, tenant: Option<TenantId>) {
        if let Some(t) = &tenant {
            self.known.insert(t.clone());
        }
        self.fallback = tenant;
    }

    /// Look up an already-normalized hostname.
    pub fn for_host(&self, normalized_host: &str) -> Option<&TenantId> {
        self.hosts.get(normalized_host)
    }

    /// Accept an override value only if it names a known tenant.
    pub fn known(&self, raw: &str) -> Option<&TenantId> {
        self.known.iter().find(|t| t.as_str() == raw)
    }

    pub fn fallback(&self) -> Option<&TenantId> {
        self.fallback.as_ref()
    }

    pub fn tenants(&self) -> impl Iterator<Item = &TenantId> {
        self.known.iter()
    }

    pub fn hosts(&self) -> impl Iterator<Item = (&str, &TenantId)> {
        self.hosts.iter().map(|(h, t)| (h.as_str(), t))
    }

    /// Parse `host=tenant,host=tenant` entries (the `tenants.hosts` key).
    pub fn parse_host_table(spec: &str) -> Result<Vec<(String, TenantId)>, MarqueeError> {
        split_list(spec)
            .map(|entry| {
                let (host, tenant) = entry.split_once('=').ok_or_else(|| {
                    MarqueeError::bad_request(format!(
                        "malformed host entry '{entry}': expected host=tenant"
                    ))
                })?;
                let host = host.trim();
                if host.is_empty() {
                    return Err(MarqueeError::bad_request(format!(
                        "malformed host entry '{entry}': empty host"
                    )));
                }
                Ok((host.to_string(), TenantId::parse(tenant)?))
            })
            .collect()
    }
}

/// Lowercase, drop a `:port` suffix and one leading `www.`.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();
    let host = strip_port(&host);
    let host = host.trim_end_matches('.');
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal: "[::1]:3000"
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((h, port)) if !h.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => host,
    }
}

/// Split a comma separated config list, dropping blanks.
pub(crate) fn split_list(spec: &str) -> impl Iterator<Item = &str> {
    spec.split(',').map(str::trim).filter(|s| !s.is_empty())
}
