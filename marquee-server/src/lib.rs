pub mod app;
pub mod config;
pub mod routes;

use anyhow::Result;
use marquee_axum::MarqueeApp;
use marquee_core::MarqueeConfig;

use crate::config::Settings;

pub struct Server {
    pub addr: String,
    pub app: MarqueeApp,
}

impl Server {
    pub async fn listen(self) -> Result<()> {
        self.app.listen(self.addr).await
    }
}

/// Build from the process environment.
pub fn build() -> Result<Server> {
    build_with(&config::load())
}

pub fn build_with(config: &MarqueeConfig) -> Result<Server> {
    let settings = Settings::from_config(config)?;
    let addr = settings.addr.clone();
    Ok(Server {
        addr,
        app: app::marquee_app(settings),
    })
}
