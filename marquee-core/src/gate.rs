//! Auth-gated redirects.
//!
//! Rules, first match wins:
//! 1. signed in and on the login page: go home
//! 2. admin prefixes (longest match): login redirect or 401 when anonymous,
//!    unauthorized redirect or 403 when the role is insufficient
//! 3. anonymous on a protected prefix: go home
//! 4. otherwise allow
//!
//! The identity is only looked up when one of the rules needs it.

use anyhow::Result;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::debug;

use crate::errors::MarqueeError;
use crate::identity::Role;
use crate::registry::split_list;
use crate::rewrite::{is_under, normalize_path, RouteTarget};
use crate::session::RequestSession;

/// Characters escaped in a `?redirect=` value. `/` stays readable.
const REDIRECT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'=')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What an admin rule does when access is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyMode {
    /// Browser pages: redirect to the login or unauthorized page.
    Redirect,
    /// API endpoints: 401 / 403 error responses.
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRule {
    pub prefix: String,
    pub roles: Vec<Role>,
    pub mode: DenyMode,
}

impl AdminRule {
    pub fn new(prefix: impl Into<String>, roles: Vec<Role>, mode: DenyMode) -> Self {
        Self {
            prefix: prefix.into(),
            roles,
            mode,
        }
    }

    pub fn admits(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub login_path: String,
    pub home_path: String,
    pub unauthorized_path: String,
    /// Anonymous visitors are sent home from these prefixes.
    pub protected: Vec<String>,
    pub admin_rules: Vec<AdminRule>,
}

impl Default for GateConfig {
    fn default() -> Self {
        let admins = vec![Role::Admin, Role::SuperAdmin];
        Self {
            login_path: "/auth".to_string(),
            home_path: "/".to_string(),
            unauthorized_path: "/auth/unauthorized".to_string(),
            protected: vec!["/arkiv".to_string()],
            admin_rules: vec![
                AdminRule::new("/admin", admins.clone(), DenyMode::Redirect),
                AdminRule::new("/api/admin", admins, DenyMode::Status),
                AdminRule::new("/api/admin/users", vec![Role::SuperAdmin], DenyMode::Status),
            ],
        }
    }
}

impl GateConfig {
    pub fn parse_protected(spec: &str) -> Vec<String> {
        split_list(spec).map(|p| normalize_path(p).to_string()).collect()
    }

    fn admin_rule_for(&self, path: &str) -> Option<&AdminRule> {
        self.admin_rules
            .iter()
            .filter(|r| is_under(path, &r.prefix))
            .max_by_key(|r| r.prefix.len())
    }
}

/// A redirect issued by the gate. Always rendered as `303 See Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub const STATUS: u16 = 303;
}

#[derive(Debug)]
pub enum GateDecision {
    Allow,
    Redirect(Redirect),
    Deny(MarqueeError),
}

#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    config: GateConfig,
}

impl AuthGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// `path` is the visible request path, before any tenant rewrite.
    pub async fn check(&self, path: &str, session: &RequestSession) -> Result<GateDecision> {
        self.check_target(RouteTarget::path(path), session).await
    }

    /// Like [`check`](Self::check); the login redirect carries the visible
    /// path and search unchanged so the visitor lands where they started.
    pub async fn check_target(
        &self,
        target: RouteTarget<'_>,
        session: &RequestSession,
    ) -> Result<GateDecision> {
        let cfg = &self.config;
        let path = normalize_path(target.path);

        if path == cfg.login_path {
            if session.is_authenticated().await? {
                debug!(path, "signed-in user on login page");
                return Ok(GateDecision::Redirect(Redirect::to(&cfg.home_path)));
            }
            return Ok(GateDecision::Allow);
        }

        if let Some(rule) = cfg.admin_rule_for(path) {
            return self.check_admin(rule, target, session).await;
        }

        if cfg.protected.iter().any(|p| is_under(path, p)) && !session.is_authenticated().await? {
            debug!(path, "anonymous user on protected prefix");
            return Ok(GateDecision::Redirect(Redirect::to(&cfg.home_path)));
        }

        Ok(GateDecision::Allow)
    }

    async fn check_admin(
        &self,
        rule: &AdminRule,
        target: RouteTarget<'_>,
        session: &RequestSession,
    ) -> Result<GateDecision> {
        let cfg = &self.config;
        let path = target.path;
        let decision = match (session.identity().await?, rule.mode) {
            (Some(identity), _) if rule.admits(&identity.role) => GateDecision::Allow,
            (None, DenyMode::Redirect) => GateDecision::Redirect(Redirect::to(format!(
                "{}?redirect={}",
                cfg.login_path,
                utf8_percent_encode(&format!("{path}{}", target.search), REDIRECT_VALUE)
            ))),
            (None, DenyMode::Status) => {
                GateDecision::Deny(MarqueeError::not_authenticated("Not authenticated"))
            }
            (Some(_), DenyMode::Redirect) => {
                GateDecision::Redirect(Redirect::to(&cfg.unauthorized_path))
            }
            (Some(identity), DenyMode::Status) => GateDecision::Deny(MarqueeError::forbidden(
                format!("role '{}' may not access {}", identity.role, rule.prefix),
            )),
        };
        if !matches!(decision, GateDecision::Allow) {
            debug!(path, rule = %rule.prefix, "admin rule refused access");
        }
        Ok(decision)
    }
}
