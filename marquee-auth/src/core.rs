// Session credential extraction.
//
// Credentials arrive either as `Authorization: Bearer <token>` or in the
// identity provider's session cookie:
//
//   sb-<project>-auth-token=<value>
//   sb-<project>-auth-token.0=<part>; sb-<project>-auth-token.1=<part>
//
// where the (joined) value is JSON, optionally prefixed with `base64-`
// and base64url encoded. The JSON is either a session object with an
// `access_token` field or the legacy `[access_token, refresh_token, ...]`
// array.

use std::collections::{BTreeMap, HashMap};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;
use marquee_core::request::parse_cookie_header;
use marquee_core::{Credentials, Identity, Role};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CredentialError;
use crate::options::SessionOptions;

const BASE64_PREFIX: &str = "base64-";

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let v = v.trim();
    let prefix = "Bearer ";
    if v.len() <= prefix.len() || !v.starts_with(prefix) {
        return None;
    }
    Some(v[prefix.len()..].trim().to_string())
}

pub fn request_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for value in headers.get_all(COOKIE) {
        if let Ok(raw) = value.to_str() {
            out.extend(parse_cookie_header(raw));
        }
    }
    out
}

/// The raw session cookie value, chunks joined in order.
///
/// When several projects have cookies, the lexicographically first name
/// wins. A chunk sequence stops at the first missing index.
pub fn session_cookie_value(
    cookies: &HashMap<String, String>,
    opts: &SessionOptions,
) -> Option<String> {
    // base name -> (whole value, chunks by index)
    let mut found: BTreeMap<&str, (Option<&str>, BTreeMap<usize, &str>)> = BTreeMap::new();

    for (name, value) in cookies {
        if !name.starts_with(&opts.cookie_prefix) {
            continue;
        }
        if name.ends_with(&opts.cookie_suffix) {
            found.entry(name.as_str()).or_default().0 = Some(value.as_str());
            continue;
        }
        let Some((base, idx)) = name.rsplit_once('.') else {
            continue;
        };
        if !base.ends_with(&opts.cookie_suffix) {
            continue;
        }
        if let Ok(idx) = idx.parse::<usize>() {
            found.entry(base).or_default().1.insert(idx, value.as_str());
        }
    }

    let (_, (whole, chunks)) = found.into_iter().next()?;
    if let Some(whole) = whole {
        return Some(whole.to_string());
    }
    let mut joined = String::new();
    for (expected, (idx, part)) in chunks.into_iter().enumerate() {
        if idx != expected {
            break;
        }
        joined.push_str(part);
    }
    (!joined.is_empty()).then_some(joined)
}

/// Pull the access token out of a session cookie value.
pub fn decode_session_value(raw: &str) -> Result<String, CredentialError> {
    let raw = percent_decode_str(raw.trim()).decode_utf8_lossy();

    let json = match raw.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('='))?;
            serde_json::from_slice::<Value>(&bytes)?
        }
        None => serde_json::from_str::<Value>(&raw)?,
    };

    let token = match &json {
        Value::Object(map) => map.get("access_token").and_then(Value::as_str),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    };

    match token {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(CredentialError::MissingAccessToken),
    }
}

/// Bearer header first, then the session cookie. Malformed cookies count
/// as no credentials.
pub fn extract_credentials(headers: &HeaderMap, opts: &SessionOptions) -> Credentials {
    if opts.accept_bearer {
        if let Some(token) = extract_bearer_token(headers) {
            return Credentials::bearer(token);
        }
    }

    let cookies = request_cookies(headers);
    let Some(raw) = session_cookie_value(&cookies, opts) else {
        return Credentials::none();
    };
    match decode_session_value(&raw) {
        Ok(token) => Credentials::bearer(token),
        Err(e) => {
            debug!(error = %e, "ignoring unreadable session cookie");
            Credentials::none()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AppMetadata {
    #[serde(default)]
    pub role: Option<String>,
}

/// The user shape shared by the provider's `/user` endpoint and its
/// access-token claims.
#[derive(Debug, Deserialize)]
pub(crate) struct UserRecord {
    #[serde(alias = "sub")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

impl From<UserRecord> for Identity {
    fn from(user: UserRecord) -> Self {
        let role = user
            .app_metadata
            .role
            .as_deref()
            .map(Role::parse)
            .unwrap_or_default();
        let identity = Identity::new(user.id, role);
        match user.email {
            Some(email) if !email.is_empty() => identity.with_email(email),
            _ => identity,
        }
    }
}
