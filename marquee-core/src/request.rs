//! The request inputs the dispatch pipeline looks at.

use std::collections::HashMap;

use url::form_urlencoded;

/// Everything the dispatcher is allowed to see about a request.
///
/// Method, headers (other than host and cookies) and body are deliberately
/// absent: dispatch decisions are a pure function of these fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFacts {
    pub host: String,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Raw fragment without the leading `#`. Browsers never send one, but
    /// callers composing URLs may.
    pub fragment: Option<String>,
    pub cookies: HashMap<String, String>,
}

impl RequestFacts {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let q = query.into();
        let q = q.strip_prefix('?').map(str::to_string).unwrap_or(q);
        self.query = if q.is_empty() { None } else { Some(q) };
        self
    }

    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        let f = fragment.into();
        let f = f.strip_prefix('#').map(str::to_string).unwrap_or(f);
        self.fragment = if f.is_empty() { None } else { Some(f) };
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Parse a `Cookie` header value (`a=1; b=2`) into the cookie map.
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        self.cookies.extend(parse_cookie_header(header));
        self
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// `?query` including the question mark, or empty.
    pub fn search(&self) -> String {
        self.query
            .as_deref()
            .map(|q| format!("?{q}"))
            .unwrap_or_default()
    }

    /// `#fragment` including the hash, or empty.
    pub fn hash(&self) -> String {
        self.fragment
            .as_deref()
            .map(|f| format!("#{f}"))
            .unwrap_or_default()
    }
}

/// Split a `Cookie` header into name/value pairs. Malformed pairs are
/// skipped; later duplicates win.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}
