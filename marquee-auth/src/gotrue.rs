// Identity lookup against a hosted GoTrue-compatible provider.

use anyhow::Result;
use async_trait::async_trait;
use marquee_core::{CredentialValidator, Credentials, Identity};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::core::UserRecord;
use crate::error::CredentialError;
use crate::options::GotrueOptions;

/// Validates access tokens with `GET {url}/auth/v1/user`.
///
/// 200 yields the user, 401/403 mean the session is invalid or expired,
/// anything else (or no answer at all) is a `BadGateway` error.
#[derive(Clone)]
pub struct GotrueValidator {
    client: Client,
    endpoint: String,
    anon_key: String,
}

impl GotrueValidator {
    pub fn new(options: &GotrueOptions) -> Result<Self> {
        let client = Client::builder().timeout(options.timeout).build()?;
        Ok(Self::with_client(client, options))
    }

    pub fn with_client(client: Client, options: &GotrueOptions) -> Self {
        Self {
            client,
            endpoint: options.user_endpoint(),
            anon_key: options.anon_key.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_user(&self, token: &str) -> Result<Option<Identity>, CredentialError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                let user: UserRecord = serde_json::from_slice(&body)
                    .map_err(|e| CredentialError::MalformedUser(e.to_string()))?;
                Ok(Some(user.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("identity provider rejected session token");
                Ok(None)
            }
            other => Err(CredentialError::UpstreamStatus(other)),
        }
    }
}

#[async_trait]
impl CredentialValidator for GotrueValidator {
    async fn validate(&self, credentials: &Credentials) -> Result<Option<Identity>> {
        let Some(token) = credentials.access_token.as_deref() else {
            return Ok(None);
        };
        self.fetch_user(token).await.map_err(|e| {
            warn!(endpoint = %self.endpoint, error = %e, "credential validation failed");
            e.into_marquee().into_anyhow()
        })
    }
}

impl std::fmt::Debug for GotrueValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GotrueValidator")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
