use marquee_core::MarqueeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("session cookie is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("session cookie is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session cookie holds no access token")]
    MissingAccessToken,

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider answered {0}")]
    UpstreamStatus(reqwest::StatusCode),

    #[error("identity provider returned an unreadable user: {0}")]
    MalformedUser(String),
}

impl CredentialError {
    pub fn into_marquee(self) -> MarqueeError {
        MarqueeError::bad_gateway("identity provider unavailable")
            .with_source(anyhow::Error::new(self))
    }
}
