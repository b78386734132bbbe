//! Hostname to tenant resolution.
//!
//! Priority: exact host table entry, then development overrides (query
//! parameter, then preference cookie), then the fallback tenant for
//! unknown production hosts. Nothing here can fail.

use tracing::{debug, warn};

use crate::registry::{normalize_host, TenantRegistry};
use crate::tenant::{TenantSource, TenantTag, Unresolved};

/// Hosts where the tenant is chosen by the developer rather than the
/// hostname.
#[derive(Debug, Clone)]
pub struct DevHosts {
    pub hosts: Vec<String>,
    /// Any host under this TLD (without the dot) counts as a dev host,
    /// unless the host table maps it explicitly.
    pub tld: Option<String>,
    pub query_param: String,
    pub cookie: String,
}

impl Default for DevHosts {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            tld: Some("test".to_string()),
            query_param: "domain".to_string(),
            cookie: "dev-domain-preference".to_string(),
        }
    }
}

impl DevHosts {
    pub fn contains(&self, normalized_host: &str) -> bool {
        if self.hosts.iter().any(|h| h == normalized_host) {
            return true;
        }
        match &self.tld {
            Some(tld) => normalized_host
                .strip_suffix(tld.as_str())
                .is_some_and(|rest| rest.ends_with('.') && rest.len() > 1),
            None => false,
        }
    }
}

/// Inputs to a resolution, already extracted from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveInput<'a> {
    pub host: &'a str,
    pub query_override: Option<&'a str>,
    pub cookie_override: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    registry: TenantRegistry,
    dev: DevHosts,
}

impl TenantResolver {
    pub fn new(registry: TenantRegistry, dev: DevHosts) -> Self {
        Self { registry, dev }
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn dev_hosts(&self) -> &DevHosts {
        &self.dev
    }

    /// Is this (raw) hostname a development host?
    pub fn is_dev_host(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.registry.for_host(&host).is_none() && self.dev.contains(&host)
    }

    pub fn resolve(&self, input: ResolveInput<'_>) -> TenantTag {
        let host = normalize_host(input.host);

        if let Some(tenant) = self.registry.for_host(&host) {
            return TenantTag::resolved(tenant.clone(), TenantSource::Host);
        }

        if self.dev.contains(&host) {
            if let Some(raw) = input.query_override {
                match self.registry.known(raw) {
                    Some(tenant) => return TenantTag::resolved(tenant.clone(), TenantSource::Query),
                    None => warn!(%host, value = raw, "ignoring unknown tenant query override"),
                }
            }
            if let Some(raw) = input.cookie_override {
                match self.registry.known(raw) {
                    Some(tenant) => {
                        return TenantTag::resolved(tenant.clone(), TenantSource::Cookie)
                    }
                    None => warn!(%host, value = raw, "ignoring unknown tenant cookie"),
                }
            }
            return TenantTag::None(Unresolved::NoOverride);
        }

        match self.registry.fallback() {
            Some(tenant) => {
                debug!(%host, tenant = %tenant, "unknown host, using fallback tenant");
                TenantTag::resolved(tenant.clone(), TenantSource::Fallback)
            }
            None => TenantTag::None(Unresolved::NoFallback),
        }
    }
}
