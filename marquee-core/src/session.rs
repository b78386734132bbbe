//! Per-request memoized identity lookup.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::OnceCell;

use crate::identity::{CredentialValidator, Credentials, Identity};

/// The request-scoped view of "who is calling".
///
/// The validator is consulted lazily and at most once: every stage and
/// handler that asks for the identity shares the same result. A failed
/// lookup leaves the cell empty, but the failure rejects the request, so
/// it is never retried within one request in practice.
pub struct RequestSession {
    credentials: Credentials,
    validator: Arc<dyn CredentialValidator>,
    identity: OnceCell<Option<Identity>>,
}

impl RequestSession {
    pub fn new(credentials: Credentials, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            credentials,
            validator,
            identity: OnceCell::new(),
        }
    }

    /// A session that is already known to be anonymous or authenticated.
    pub fn resolved(identity: Option<Identity>) -> Self {
        Self {
            credentials: Credentials::none(),
            validator: Arc::new(crate::identity::Anonymous),
            identity: OnceCell::new_with(Some(identity)),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub async fn identity(&self) -> Result<Option<&Identity>> {
        let identity = self
            .identity
            .get_or_try_init(|| async {
                if self.credentials.is_empty() {
                    return Ok(None);
                }
                self.validator.validate(&self.credentials).await
            })
            .await?;
        Ok(identity.as_ref())
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.identity().await?.is_some())
    }

    /// Whether the validator has already been consulted.
    pub fn is_resolved(&self) -> bool {
        self.identity.initialized()
    }
}

impl std::fmt::Debug for RequestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSession")
            .field("has_credentials", &!self.credentials.is_empty())
            .field("identity", &self.identity.get())
            .finish()
    }
}
