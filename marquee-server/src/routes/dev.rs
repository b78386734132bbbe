use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use marquee_axum::MarqueeAxumError;
use marquee_core::errors::MarqueeError;
use serde::Deserialize;
use tracing::debug;

use super::{same_site_path, ServerState};

const ONE_YEAR: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Default, Deserialize)]
pub struct SetTenantQuery {
    pub next: Option<String>,
}

/// Remember a development tenant in the preference cookie, then redirect.
pub async fn set_tenant(
    State(state): State<ServerState>,
    Path(tenant): Path<String>,
    Query(query): Query<SetTenantQuery>,
) -> Result<Response, MarqueeAxumError> {
    let tenant = state
        .known_tenant(&tenant)
        .ok_or_else(|| MarqueeError::bad_request(format!("unknown tenant '{tenant}'")))?;

    let next = query.next.as_deref().and_then(same_site_path).unwrap_or("/");

    debug!(%tenant, next, "development tenant selected");
    let cookie = format!(
        "{}={tenant}; Path=/; Max-Age={ONE_YEAR}; SameSite=Lax",
        state.dev.cookie
    );
    Ok(([(SET_COOKIE, cookie)], Redirect::to(next)).into_response())
}
