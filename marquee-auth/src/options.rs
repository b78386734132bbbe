// Credential validation options and configuration.

use std::time::Duration;

use marquee_core::MarqueeConfigSnapshot;
use serde::{Deserialize, Serialize};

/// Which validator turns session credentials into an identity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Nobody is ever signed in.
    #[default]
    Anonymous,
    /// Ask the hosted identity provider (`GET /auth/v1/user`).
    Gotrue,
    /// Verify the access token locally with the project's JWT secret.
    Jwt,
}

impl ValidatorKind {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "anonymous" | "none" => Ok(Self::Anonymous),
            "gotrue" | "supabase" => Ok(Self::Gotrue),
            "jwt" => Ok(Self::Jwt),
            other => Err(format!("unknown credential validator '{other}'")),
        }
    }
}

/// HMAC algorithms accepted for project-secret signed tokens.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

/// Main credential validation configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AuthOptions {
    pub validator: ValidatorKind,
    pub gotrue: GotrueOptions,
    pub jwt: JwtOptions,
    pub session: SessionOptions,
}

impl AuthOptions {
    pub fn validate(&self) -> Result<(), String> {
        match self.validator {
            ValidatorKind::Anonymous => Ok(()),
            ValidatorKind::Gotrue => self
                .gotrue
                .validate()
                .map_err(|e| format!("identity provider validation failed: {e}")),
            ValidatorKind::Jwt => self
                .jwt
                .validate()
                .map_err(|e| format!("JWT validation failed: {e}")),
        }?;
        self.session.validate()
    }

    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }

    /// Read the `auth.*` keys. Absent keys keep their defaults.
    pub fn from_snapshot(snap: &MarqueeConfigSnapshot) -> Result<Self, String> {
        let mut out = Self::default();

        if let Some(v) = snap.get("auth.validator") {
            out.validator = ValidatorKind::parse(v)?;
        }
        if let Some(v) = snap.get("auth.url") {
            out.gotrue.url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = snap.get("auth.anon_key") {
            out.gotrue.anon_key = v.trim().to_string();
        }
        if let Some(v) = snap.get("auth.timeout") {
            out.gotrue.timeout = humantime_serde::re::humantime::parse_duration(v.trim())
                .map_err(|e| format!("invalid auth.timeout '{v}': {e}"))?;
        }
        if let Some(v) = snap.get("auth.jwt_secret") {
            let v = v.trim();
            out.jwt.secret = (!v.is_empty()).then(|| v.to_string());
        }
        if let Some(v) = snap.get("auth.jwt_audience") {
            out.jwt.audience = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = snap.get("auth.cookie_prefix") {
            out.session.cookie_prefix = v.trim().to_string();
        }

        out.validate()?;
        Ok(out)
    }
}

/// Hosted identity provider (GoTrue-compatible) configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GotrueOptions {
    /// Project base URL, e.g. `https://abc.supabase.co`
    pub url: String,
    /// Public (anon) API key sent as the `apikey` header
    pub anon_key: String,
    /// Request timeout for the user lookup
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for GotrueOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl GotrueOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err("identity provider URL must be a valid HTTP/HTTPS URL".to_string());
        }
        if self.anon_key.is_empty() {
            return Err("identity provider anon key cannot be empty".to_string());
        }
        if self.timeout.is_zero() {
            return Err("identity provider timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn user_endpoint(&self) -> String {
        format!("{}/auth/v1/user", self.url.trim_end_matches('/'))
    }
}

/// Local JWT verification options
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Project JWT secret
    pub secret: Option<String>,
    /// Accepted `aud` values
    pub audience: Vec<String>,
    /// Clock skew tolerance in seconds
    pub leeway: u64,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            secret: None,
            audience: vec!["authenticated".to_string()],
            leeway: 30,
        }
    }
}

impl JwtOptions {
    pub fn validate(&self) -> Result<(), String> {
        match &self.secret {
            None => return Err("HMAC algorithms require a secret".to_string()),
            Some(s) if s.len() < 16 => {
                return Err("JWT secret must be at least 16 characters".to_string())
            }
            Some(_) => {}
        }
        if self.audience.is_empty() {
            return Err("JWT audience cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Where session credentials live on a request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionOptions {
    /// Session cookies are named `{cookie_prefix}<project>{cookie_suffix}`,
    /// optionally chunked as `.0`, `.1`, ...
    pub cookie_prefix: String,
    pub cookie_suffix: String,
    /// Also accept `Authorization: Bearer <token>`
    pub accept_bearer: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            cookie_prefix: "sb-".to_string(),
            cookie_suffix: "-auth-token".to_string(),
            accept_bearer: true,
        }
    }
}

impl SessionOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.cookie_suffix.is_empty() {
            return Err("session cookie suffix cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Builder pattern for AuthOptions configuration
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    validator: Option<ValidatorKind>,
    gotrue: Option<GotrueOptions>,
    jwt: Option<JwtOptions>,
    session: Option<SessionOptions>,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validator(mut self, kind: ValidatorKind) -> Self {
        self.validator = Some(kind);
        self
    }

    pub fn gotrue(mut self, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let mut opts = self.gotrue.take().unwrap_or_default();
        opts.url = url.into();
        opts.anon_key = anon_key.into();
        self.gotrue = Some(opts);
        self.validator.get_or_insert(ValidatorKind::Gotrue);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        let mut opts = self.gotrue.take().unwrap_or_default();
        opts.timeout = timeout;
        self.gotrue = Some(opts);
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        let mut opts = self.jwt.take().unwrap_or_default();
        opts.secret = Some(secret.into());
        self.jwt = Some(opts);
        self.validator.get_or_insert(ValidatorKind::Jwt);
        self
    }

    pub fn session(mut self, session: SessionOptions) -> Self {
        self.session = Some(session);
        self
    }

    pub fn build(self) -> AuthOptions {
        AuthOptions {
            validator: self.validator.unwrap_or_default(),
            gotrue: self.gotrue.unwrap_or_default(),
            jwt: self.jwt.unwrap_or_default(),
            session: self.session.unwrap_or_default(),
        }
    }

    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::MarqueeConfig;

    #[test]
    fn builder_infers_validator() {
        let opts = AuthOptions::builder()
            .gotrue("https://abc.supabase.co/", "anon")
            .build_validated()
            .unwrap();
        assert_eq!(opts.validator, ValidatorKind::Gotrue);
        assert_eq!(opts.gotrue.user_endpoint(), "https://abc.supabase.co/auth/v1/user");
    }

    #[test]
    fn jwt_requires_a_real_secret() {
        assert!(AuthOptions::builder().jwt_secret("short").build_validated().is_err());
        assert!(AuthOptions::builder()
            .jwt_secret("a-much-longer-project-secret")
            .build_validated()
            .is_ok());
    }

    #[test]
    fn from_snapshot_reads_auth_keys() {
        let mut c = MarqueeConfig::new();
        c.set("auth.validator", "gotrue");
        c.set("auth.url", "http://127.0.0.1:54321/");
        c.set("auth.anon_key", "anon");
        c.set("auth.timeout", "1500ms");
        let opts = AuthOptions::from_snapshot(&c.snapshot()).unwrap();
        assert_eq!(opts.gotrue.url, "http://127.0.0.1:54321");
        assert_eq!(opts.gotrue.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn from_snapshot_rejects_incomplete_provider() {
        let mut c = MarqueeConfig::new();
        c.set("auth.validator", "gotrue");
        assert!(AuthOptions::from_snapshot(&c.snapshot()).is_err());
        c.set("auth.validator", "ldap");
        assert!(AuthOptions::from_snapshot(&c.snapshot()).is_err());
    }

    #[test]
    fn options_roundtrip_through_json() {
        let opts = AuthOptions::builder().gotrue("https://x.example", "k").build();
        let v = serde_json::to_value(&opts).unwrap();
        assert_eq!(v["validator"], "gotrue");
        assert_eq!(v["gotrue"]["timeout"], "5s");
    }
}
