use std::env;

use anyhow::{Context, Result};
use marquee_auth::IdentityService;
use marquee_core::{DispatchConfig, MarqueeConfig};

/// Environment variables with this prefix override configuration keys,
/// e.g. `MARQUEE__TENANTS__FALLBACK=maria` sets `tenants.fallback`.
pub const ENV_PREFIX: &str = "MARQUEE__";

/// Configure all settings: defaults, then the environment.
pub fn load() -> MarqueeConfig {
    let mut config = MarqueeConfig::new();
    configure_http(&mut config);
    config.load_env(ENV_PREFIX);
    config
}

/// Configure HTTP server settings
fn configure_http(config: &mut MarqueeConfig) {
    let host = env::var("HTTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("HTTP_PORT").unwrap_or_else(|_| "3000".to_string());

    config.set("http.host", host);
    config.set("http.port", port);
}

/// Typed, validated settings. Any malformed key fails startup.
#[derive(Debug)]
pub struct Settings {
    pub addr: String,
    pub dispatch: DispatchConfig,
    pub identity: IdentityService,
}

impl Settings {
    pub fn from_config(config: &MarqueeConfig) -> Result<Self> {
        let snap = config.snapshot();

        let host = snap.get("http.host").unwrap_or("127.0.0.1");
        let port = snap.get("http.port").unwrap_or("3000");
        port.parse::<u16>()
            .with_context(|| format!("invalid http.port '{port}'"))?;

        Ok(Self {
            addr: format!("{host}:{port}"),
            dispatch: DispatchConfig::from_snapshot(&snap)?,
            identity: IdentityService::from_snapshot(&snap)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_from_keys() {
        let mut c = MarqueeConfig::new();
        c.set("http.host", "0.0.0.0");
        c.set("http.port", "8080");
        c.set("tenants.fallback", "");
        let s = Settings::from_config(&c).unwrap();
        assert_eq!(s.addr, "0.0.0.0:8080");
        assert!(s.dispatch.registry.fallback().is_none());
    }

    #[test]
    fn bad_port_fails_startup() {
        let mut c = MarqueeConfig::new();
        c.set("http.port", "eighty");
        assert!(Settings::from_config(&c).is_err());
    }

    #[test]
    fn env_prefix_overrides() {
        let mut c = MarqueeConfig::new();
        c.load_vars(
            ENV_PREFIX,
            vec![("MARQUEE__TENANTS__FALLBACK".to_string(), "maria".to_string())],
        );
        let s = Settings::from_config(&c).unwrap();
        assert_eq!(s.dispatch.registry.fallback().unwrap().as_str(), "maria");
    }
}
