//! Authenticated identity and the credential-validation seam.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

/// Account role, read from the identity provider's `app_metadata.role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
    SuperAdmin,
    /// A role this deployment does not know about. Never privileged.
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "user" => Role::User,
            "admin" => Role::Admin,
            "super_admin" => Role::SuperAdmin,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
            Role::Other(s) => s,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified user, as returned by a [`CredentialValidator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: None,
            role,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Raw session material pulled off a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
    }
}

/// Turns session credentials into a verified identity.
///
/// `Ok(None)` means "no valid session" and is not an error. `Err` is
/// reserved for transport failures talking to the identity provider.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, credentials: &Credentials) -> Result<Option<Identity>>;
}

/// Validator used when no identity provider is configured: nobody is
/// ever authenticated.
pub struct Anonymous;

#[async_trait]
impl CredentialValidator for Anonymous {
    async fn validate(&self, _credentials: &Credentials) -> Result<Option<Identity>> {
        Ok(None)
    }
}
