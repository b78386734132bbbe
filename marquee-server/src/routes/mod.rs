pub mod admin;
pub mod dev;
pub mod pages;

use std::sync::Arc;

use marquee_core::{DevHosts, TenantId, TenantRegistry};

/// Read-only data the handlers need.
#[derive(Clone, Debug)]
pub struct ServerState {
    pub registry: Arc<TenantRegistry>,
    pub dev: Arc<DevHosts>,
}

impl ServerState {
    pub fn known_tenant(&self, raw: &str) -> Option<TenantId> {
        self.registry.known(raw).cloned()
    }
}

/// `target` if it is a path on this site. Browsers read `\` as `/` and
/// drop tabs and newlines, so `/\host` and `/\t/host` leave the site too.
pub fn same_site_path(target: &str) -> Option<&str> {
    let rest = target.strip_prefix('/')?;
    let leaves_site = rest.starts_with('/')
        || target.contains('\\')
        || target.chars().any(char::is_control);
    (!leaves_site).then_some(target)
}

/// Escape text for an HTML body or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_same_site_paths_pass() {
        assert_eq!(same_site_path("/maria/shop?x=1"), Some("/maria/shop?x=1"));
        assert_eq!(same_site_path("/"), Some("/"));
        for target in [
            "",
            "maria",
            "//evil.example",
            "/\\evil.example",
            "/\t/evil.example",
            "https://evil.example",
        ] {
            assert_eq!(same_site_path(target), None, "{target:?}");
        }
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#x27;y&#x27;"
        );
    }
}
