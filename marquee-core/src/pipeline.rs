//! The dispatch pipeline: tenant resolution, then path rewriting, then
//! the auth gate.
//!
//! Each stage is a trait whose input is the previous stage's output, and
//! [`DispatcherBuilder`] only exposes the next composition step once the
//! previous stage is in place. A dispatcher with stages missing or out of
//! order does not compile:
//!
//! ```compile_fail
//! use marquee_core::{AuthGate, Dispatcher};
//! // No tenant or rewrite stage yet: `gate` is not available.
//! let d = Dispatcher::builder().gate(AuthGate::default()).build();
//! ```
//!
//! ```
//! use marquee_core::{AuthGate, Dispatcher, PathRewriter, TenantResolver};
//! let d = Dispatcher::builder()
//!     .tenants(TenantResolver::default())
//!     .rewrite(PathRewriter::default())
//!     .gate(AuthGate::default())
//!     .build();
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::config::DispatchConfig;
use crate::gate::{AuthGate, GateDecision, Redirect};
use crate::request::RequestFacts;
use crate::resolver::{ResolveInput, TenantResolver};
use crate::rewrite::{PathRewriter, Rewrite, RouteTarget};
use crate::session::RequestSession;
use crate::tenant::{TenantTag, Unresolved};

/// Stage 1: facts in, tenant tag out.
pub trait TenantStage: Send + Sync {
    fn resolve(&self, facts: &RequestFacts) -> TenantTag;
}

/// Stage 2: facts plus the stage 1 tag in, rewrite decision out.
pub trait RewriteStage: Send + Sync {
    fn rewrite(&self, facts: &RequestFacts, tag: &TenantTag) -> Rewrite;
}

/// Stage 3: the routed request plus the session in, gate decision out.
#[async_trait]
pub trait GateStage: Send + Sync {
    async fn check(
        &self,
        facts: &RequestFacts,
        routed: &Routed,
        session: &RequestSession,
    ) -> Result<GateDecision>;
}

/// Output of stages 1 and 2, and what handlers receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub tenant: TenantTag,
    pub rewrite: Rewrite,
}

impl Routed {
    pub fn effective_path<'a>(&'a self, facts: &'a RequestFacts) -> &'a str {
        self.rewrite.effective_path(&facts.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Proceed(Routed),
    Redirect(Redirect),
}

impl TenantStage for TenantResolver {
    fn resolve(&self, facts: &RequestFacts) -> TenantTag {
        // Global routes carry no tenant; the dev landing page lets the
        // developer pick one.
        let host_is_dev = self.is_dev_host(&facts.host);
        if host_is_dev && facts.path == "/" {
            return TenantTag::None(Unresolved::DevLanding);
        }

        let dev = self.dev_hosts();
        let query = facts.query_param(&dev.query_param);
        TenantResolver::resolve(
            self,
            ResolveInput {
                host: &facts.host,
                query_override: query.as_deref(),
                cookie_override: facts.cookie(&dev.cookie),
            },
        )
    }
}

/// Tenant stage wrapper that skips resolution on root routes.
pub struct RootAwareTenants<T> {
    inner: T,
    rewriter: PathRewriter,
}

impl<T: TenantStage> RootAwareTenants<T> {
    pub fn new(inner: T, rewriter: PathRewriter) -> Self {
        Self { inner, rewriter }
    }
}

impl<T: TenantStage> TenantStage for RootAwareTenants<T> {
    fn resolve(&self, facts: &RequestFacts) -> TenantTag {
        if self.rewriter.root_routes().contains(&facts.path) {
            return TenantTag::None(Unresolved::RootRoute);
        }
        self.inner.resolve(facts)
    }
}

impl RewriteStage for PathRewriter {
    fn rewrite(&self, facts: &RequestFacts, tag: &TenantTag) -> Rewrite {
        let search = facts.search();
        let hash = facts.hash();
        PathRewriter::rewrite(
            self,
            RouteTarget {
                path: &facts.path,
                search: &search,
                hash: &hash,
            },
            tag.tenant(),
        )
    }
}

#[async_trait]
impl GateStage for AuthGate {
    async fn check(
        &self,
        facts: &RequestFacts,
        _routed: &Routed,
        session: &RequestSession,
    ) -> Result<GateDecision> {
        let search = facts.search();
        let hash = facts.hash();
        let target = RouteTarget {
            path: &facts.path,
            search: &search,
            hash: &hash,
        };
        self.check_target(target, session).await
    }
}

/// Marker for a stage not yet supplied to the builder.
pub struct Missing;

pub struct DispatcherBuilder<T = Missing, R = Missing, G = Missing> {
    tenants: T,
    rewriter: R,
    gate: G,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            tenants: Missing,
            rewriter: Missing,
            gate: Missing,
        }
    }

    pub fn tenants<T: TenantStage + 'static>(self, tenants: T) -> DispatcherBuilder<T> {
        DispatcherBuilder {
            tenants,
            rewriter: Missing,
            gate: Missing,
        }
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TenantStage + 'static> DispatcherBuilder<T> {
    pub fn rewrite<R: RewriteStage + 'static>(self, rewriter: R) -> DispatcherBuilder<T, R> {
        DispatcherBuilder {
            tenants: self.tenants,
            rewriter,
            gate: Missing,
        }
    }
}

impl<T, R> DispatcherBuilder<T, R>
where
    T: TenantStage + 'static,
    R: RewriteStage + 'static,
{
    pub fn gate<G: GateStage + 'static>(self, gate: G) -> DispatcherBuilder<T, R, G> {
        DispatcherBuilder {
            tenants: self.tenants,
            rewriter: self.rewriter,
            gate,
        }
    }
}

impl<T, R, G> DispatcherBuilder<T, R, G>
where
    T: TenantStage + 'static,
    R: RewriteStage + 'static,
    G: GateStage + 'static,
{
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            tenants: Arc::new(self.tenants),
            rewriter: Arc::new(self.rewriter),
            gate: Arc::new(self.gate),
        }
    }
}

/// A composed pipeline. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Dispatcher {
    tenants: Arc<dyn TenantStage>,
    rewriter: Arc<dyn RewriteStage>,
    gate: Arc<dyn GateStage>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The standard pipeline for a configuration.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let rewriter = PathRewriter::new(config.root_routes.clone());
        Self::builder()
            .tenants(RootAwareTenants::new(
                TenantResolver::new(config.registry.clone(), config.dev.clone()),
                rewriter.clone(),
            ))
            .rewrite(rewriter)
            .gate(AuthGate::new(config.gate.clone()))
            .build()
    }

    /// Stages 1 and 2 only. Synchronous and infallible.
    pub fn route(&self, facts: &RequestFacts) -> Routed {
        let tenant = self.tenants.resolve(facts);
        let rewrite = self.rewriter.rewrite(facts, &tenant);
        Routed { tenant, rewrite }
    }

    /// The full pipeline. `Err` carries either a gate denial
    /// (`MarqueeError` 401/403) or a credential-validation failure.
    pub async fn dispatch(&self, facts: &RequestFacts, session: &RequestSession) -> Result<Dispatch> {
        self.dispatch_routed(facts, self.route(facts), session).await
    }

    /// Stage 3 on the output of [`route`](Self::route), for callers that
    /// also need the routing decision when the gate refuses the request.
    pub async fn dispatch_routed(
        &self,
        facts: &RequestFacts,
        routed: Routed,
        session: &RequestSession,
    ) -> Result<Dispatch> {
        debug!(
            host = %facts.host,
            path = %facts.path,
            tenant = %routed.tenant.label(),
            effective = %routed.effective_path(facts),
            "routed request"
        );

        match self.gate.check(facts, &routed, session).await? {
            GateDecision::Allow => Ok(Dispatch::Proceed(routed)),
            GateDecision::Redirect(r) => Ok(Dispatch::Redirect(r)),
            GateDecision::Deny(e) => Err(e.into_anyhow()),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
