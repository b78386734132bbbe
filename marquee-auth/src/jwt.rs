// Local access-token verification with the project's JWT secret.

use anyhow::Result;
use async_trait::async_trait;
use marquee_core::{CredentialValidator, Credentials, Identity};

use crate::options::JwtOptions;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
use crate::options::JwtAlgorithm;

/// Verifies HMAC-signed access tokens without a network round trip.
///
/// A bad signature, wrong audience or expired token is "no session",
/// never an error.
pub struct JwtValidator {
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    key: jsonwebtoken::DecodingKey,
    #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
    validation: jsonwebtoken::Validation,
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtValidator {
    fn algorithm(alg: &JwtAlgorithm) -> jsonwebtoken::Algorithm {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    pub fn new(options: &JwtOptions) -> Result<Self> {
        options.validate().map_err(anyhow::Error::msg)?;
        let secret = options
            .secret
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("JWT secret is not configured"))?;

        let mut validation = jsonwebtoken::Validation::new(Self::algorithm(&options.algorithm));
        validation.set_audience(&options.audience);
        validation.leeway = options.leeway;

        Ok(Self {
            key: jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    fn verify(&self, token: &str) -> Option<Identity> {
        match jsonwebtoken::decode::<crate::core::UserRecord>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                tracing::debug!(error = %e, "access token rejected");
                None
            }
        }
    }
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtValidator {
    pub fn new(_options: &JwtOptions) -> Result<Self> {
        Err(anyhow::anyhow!(
            "JWT support is disabled (enable one of: jwt-aws-lc-rs, jwt-rust-crypto)"
        ))
    }

    fn verify(&self, _token: &str) -> Option<Identity> {
        None
    }
}

#[async_trait]
impl CredentialValidator for JwtValidator {
    async fn validate(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        Ok(credentials
            .access_token
            .as_deref()
            .and_then(|token| self.verify(token)))
    }
}
