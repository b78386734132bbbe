// Identity service: one validator, many request sessions.

use std::sync::Arc;

use anyhow::{Context, Result};
use http::HeaderMap;
use marquee_core::{Anonymous, CredentialValidator, Credentials, MarqueeConfigSnapshot, RequestSession};
use tracing::info;

use crate::core::extract_credentials;
use crate::gotrue::GotrueValidator;
use crate::jwt::JwtValidator;
use crate::options::{AuthOptions, SessionOptions, ValidatorKind};

/// Shared, cheap to clone. Builds a fresh memoized [`RequestSession`]
/// for each request.
#[derive(Clone)]
pub struct IdentityService {
    validator: Arc<dyn CredentialValidator>,
    session: SessionOptions,
}

impl IdentityService {
    pub fn new(validator: Arc<dyn CredentialValidator>, session: SessionOptions) -> Self {
        Self { validator, session }
    }

    pub fn anonymous() -> Self {
        Self::new(Arc::new(Anonymous), SessionOptions::default())
    }

    pub fn from_options(options: &AuthOptions) -> Result<Self> {
        options.validate().map_err(anyhow::Error::msg)?;

        let validator: Arc<dyn CredentialValidator> = match options.validator {
            ValidatorKind::Anonymous => Arc::new(Anonymous),
            ValidatorKind::Gotrue => Arc::new(
                GotrueValidator::new(&options.gotrue).context("building identity provider client")?,
            ),
            ValidatorKind::Jwt => Arc::new(JwtValidator::new(&options.jwt)?),
        };
        info!(validator = ?options.validator, "credential validator configured");

        Ok(Self::new(validator, options.session.clone()))
    }

    pub fn from_snapshot(snap: &MarqueeConfigSnapshot) -> Result<Self> {
        let options = AuthOptions::from_snapshot(snap)
            .map_err(anyhow::Error::msg)
            .context("invalid auth configuration")?;
        Self::from_options(&options)
    }

    pub fn validator(&self) -> &Arc<dyn CredentialValidator> {
        &self.validator
    }

    pub fn credentials(&self, headers: &HeaderMap) -> Credentials {
        extract_credentials(headers, &self.session)
    }

    /// The validator is not consulted here; the session does that lazily.
    pub fn session(&self, headers: &HeaderMap) -> RequestSession {
        RequestSession::new(self.credentials(headers), Arc::clone(&self.validator))
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
