//! # Configuration
//!
//! Marquee keeps a minimal string key/value store, mirroring the
//! `app.set()` / `app.get()` style:
//!
//! ```rust
//! use marquee_core::MarqueeConfig;
//! let mut config = MarqueeConfig::new();
//!
//! config.set("tenants.fallback", "rikuy");
//! assert_eq!(config.get("tenants.fallback"), Some("rikuy"));
//! ```
//!
//! ## Environment overrides
//! Variables with a prefix are folded into keys, `__` becoming `.`:
//!
//! ```bash
//! export MARQUEE__TENANTS__HOSTS="mariaocampo.se=maria,cranmer.se=danny"
//! export MARQUEE__TENANTS__FALLBACK=""   # unknown hosts get no tenant
//! ```
//!
//! The typed [`DispatchConfig`] is then built from a snapshot. Keys that
//! are absent keep their defaults; keys that are present but malformed
//! are startup errors.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::gate::GateConfig;
use crate::registry::{split_list, TenantRegistry};
use crate::resolver::DevHosts;
use crate::rewrite::{normalize_path, RootRoutes};
use crate::tenant::TenantId;

#[derive(Debug, Default)]
pub struct MarqueeConfig {
    values: HashMap<String, String>,
}

impl MarqueeConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Fold `PREFIX__A__B=value` pairs into `a.b = value`.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                self.set(normalized, value);
            }
        }
    }

    /// [`load_vars`](Self::load_vars) over the process environment.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub fn snapshot(&self) -> MarqueeConfigSnapshot {
        MarqueeConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarqueeConfigSnapshot {
    map: HashMap<String, String>,
}

impl MarqueeConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }
}

/// Everything the dispatch pipeline needs, validated.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub registry: TenantRegistry,
    pub dev: DevHosts,
    pub root_routes: RootRoutes,
    pub gate: GateConfig,
    /// Echo host/path/tenant in `x-debug-*` response headers.
    pub debug_headers: bool,
}

const DEFAULT_HOSTS: &str =
    "mariaocampo.se=maria,cranmer.se=danny,valle-sagrado.test=danny,rikuy.one=rikuy";
const DEFAULT_FALLBACK: &str = "rikuy";

impl Default for DispatchConfig {
    fn default() -> Self {
        let mut registry = TenantRegistry::new();
        for (host, tenant) in TenantRegistry::parse_host_table(DEFAULT_HOSTS).unwrap_or_default() {
            registry.register_host(host, tenant);
        }
        registry.set_fallback(TenantId::parse(DEFAULT_FALLBACK).ok());
        Self {
            registry,
            dev: DevHosts::default(),
            root_routes: RootRoutes::default(),
            gate: GateConfig::default(),
            debug_headers: cfg!(debug_assertions),
        }
    }
}

impl DispatchConfig {
    pub fn from_snapshot(snap: &MarqueeConfigSnapshot) -> Result<Self> {
        let mut out = Self::default();

        if let Some(hosts) = snap.get("tenants.hosts") {
            let mut registry = TenantRegistry::new();
            for (host, tenant) in
                TenantRegistry::parse_host_table(hosts).context("invalid tenants.hosts")?
            {
                registry.register_host(host, tenant);
            }
            registry.set_fallback(out.registry.fallback().cloned());
            out.registry = registry;
        }

        if let Some(known) = snap.get("tenants.known") {
            for raw in split_list(known) {
                out.registry
                    .register_tenant(TenantId::parse(raw).context("invalid tenants.known")?);
            }
        }

        if let Some(fallback) = snap.get("tenants.fallback") {
            let fallback = fallback.trim();
            let fallback = if fallback.is_empty() {
                None
            } else {
                Some(TenantId::parse(fallback).context("invalid tenants.fallback")?)
            };
            out.registry.set_fallback(fallback);
        }

        if let Some(hosts) = snap.get("dev.hosts") {
            out.dev.hosts = split_list(hosts).map(|h| h.to_ascii_lowercase()).collect();
        }
        if let Some(tld) = snap.get("dev.tld") {
            let tld = tld.trim().trim_start_matches('.');
            out.dev.tld = (!tld.is_empty()).then(|| tld.to_ascii_lowercase());
        }
        if let Some(cookie) = snap.get("dev.cookie") {
            out.dev.cookie = cookie.trim().to_string();
        }
        if let Some(param) = snap.get("dev.query_param") {
            out.dev.query_param = param.trim().to_string();
        }

        if let Some(routes) = snap.get("routes.root") {
            out.root_routes = RootRoutes::parse(routes).context("invalid routes.root")?;
        }

        if let Some(p) = snap.get("auth.login_path") {
            out.gate.login_path = normalize_path(p.trim()).to_string();
        }
        if let Some(p) = snap.get("auth.home_path") {
            out.gate.home_path = p.trim().to_string();
        }
        if let Some(p) = snap.get("auth.unauthorized_path") {
            out.gate.unauthorized_path = p.trim().to_string();
        }
        if let Some(p) = snap.get("auth.protected") {
            out.gate.protected = GateConfig::parse_protected(p);
        }

        if let Some(raw) = snap.get("dispatch.debug_headers") {
            out.debug_headers = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid dispatch.debug_headers '{raw}'"))?;
        }

        Ok(out)
    }
}
