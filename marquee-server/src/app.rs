use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use marquee_axum::{DispatchState, MarqueeApp};

use crate::config::Settings;
use crate::routes::{admin, dev, pages, ServerState};

pub fn marquee_app(settings: Settings) -> MarqueeApp {
    let state = ServerState {
        registry: Arc::new(settings.dispatch.registry.clone()),
        dev: Arc::new(settings.dispatch.dev.clone()),
    };

    // Tenant routes only ever see rewritten paths; `/{tenant}` is never
    // typed by a visitor on a production host. Global endpoints live under
    // a root route so no tenant prefix is added to them.
    let router = Router::new()
        .route("/", get(pages::dev_landing))
        .route("/api/health", get(pages::health))
        .route("/auth", get(pages::login))
        .route("/auth/unauthorized", get(pages::unauthorized))
        .route("/admin", get(admin::dashboard))
        .route("/admin/{*rest}", get(admin::dashboard))
        .route("/api/admin/{*rest}", get(admin::api))
        .route("/api/dev/tenant/{tenant}", get(dev::set_tenant))
        .route("/{tenant}", get(pages::tenant_home))
        .route("/{tenant}/{*rest}", get(pages::tenant_page))
        .with_state(state);

    MarqueeApp::new(DispatchState::from_config(&settings.dispatch, settings.identity)).merge(router)
}
