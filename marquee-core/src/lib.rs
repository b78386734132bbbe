//! marquee-core: framework-agnostic request dispatch for multi-tenant
//! storefronts.
//!
//! Three stages run per request, in this order:
//! - [`TenantResolver`]: hostname (or a development override) to tenant
//! - [`PathRewriter`]: tenant-prefixed route path, root routes untouched
//! - [`AuthGate`]: redirects and denials driven by the memoized
//!   [`RequestSession`]
//!
//! [`Dispatcher`] composes them; see [`pipeline`] for the typed builder.

pub mod config;
pub mod errors;
pub mod gate;
pub mod identity;
pub mod pipeline;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod rewrite;
pub mod session;
pub mod tenant;

pub use config::{DispatchConfig, MarqueeConfig, MarqueeConfigSnapshot};
pub use errors::{ErrorKind, MarqueeError};
pub use gate::{AdminRule, AuthGate, DenyMode, GateConfig, GateDecision, Redirect};
pub use identity::{Anonymous, CredentialValidator, Credentials, Identity, Role};
pub use pipeline::{
    Dispatch, Dispatcher, DispatcherBuilder, GateStage, RewriteStage, RootAwareTenants, Routed,
    TenantStage,
};
pub use registry::{normalize_host, TenantRegistry};
pub use request::RequestFacts;
pub use resolver::{DevHosts, ResolveInput, TenantResolver};
pub use rewrite::{PathRewriter, Rewrite, RootRoutes, RouteTarget};
pub use session::RequestSession;
pub use tenant::{TenantId, TenantSource, TenantTag, Unresolved};
