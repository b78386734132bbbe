// In-memory token table, for development and tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use marquee_core::{CredentialValidator, Credentials, Identity};

#[derive(Debug, Clone, Default)]
pub struct StaticValidator {
    tokens: HashMap<String, Identity>,
}

impl StaticValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.insert(token, identity);
        self
    }

    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl CredentialValidator for StaticValidator {
    async fn validate(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        Ok(credentials
            .access_token
            .as_deref()
            .and_then(|t| self.tokens.get(t))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::Role;

    #[tokio::test]
    async fn looks_up_known_tokens_only() {
        let v = StaticValidator::new().with_token("admin-token", Identity::new("a1", Role::Admin));
        assert_eq!(
            v.validate(&Credentials::bearer("admin-token")).await.unwrap().unwrap().role,
            Role::Admin
        );
        assert!(v.validate(&Credentials::bearer("other")).await.unwrap().is_none());
        assert!(v.validate(&Credentials::none()).await.unwrap().is_none());
    }
}
