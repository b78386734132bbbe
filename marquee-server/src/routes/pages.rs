use axum::extract::{OriginalUri, Path, Query, State};
use axum::response::Html;
use marquee_axum::{CurrentIdentity, CurrentTenant, MarqueeAxumError};
use marquee_core::errors::MarqueeError;
use marquee_core::TenantId;
use serde::Deserialize;

use super::{escape_html, same_site_path, ServerState};

fn tenant_or_404(state: &ServerState, raw: &str) -> Result<TenantId, MarqueeAxumError> {
    state
        .known_tenant(raw)
        .ok_or_else(|| MarqueeError::not_found(format!("no storefront named '{raw}'")).into())
}

/// Development tenant picker, shown for bare `/` on development hosts.
pub async fn dev_landing(
    State(state): State<ServerState>,
    CurrentTenant(tag): CurrentTenant,
) -> Html<String> {
    let links: String = state
        .registry
        .tenants()
        .map(|t| format!(r#"<li><a href="/api/dev/tenant/{t}?next=/{t}">{t}</a></li>"#))
        .collect();
    Html(format!(
        "<h1>Storefronts</h1><p>tenant: {}</p><ul>{links}</ul>",
        tag.label()
    ))
}

pub async fn tenant_home(
    State(state): State<ServerState>,
    Path(tenant): Path<String>,
    identity: CurrentIdentity,
) -> Result<Html<String>, MarqueeAxumError> {
    let tenant = tenant_or_404(&state, &tenant)?;
    Ok(Html(format!(
        "<h1>{tenant}</h1><p>{}</p>",
        greeting(&identity)
    )))
}

pub async fn tenant_page(
    State(state): State<ServerState>,
    Path((tenant, rest)): Path<(String, String)>,
    OriginalUri(visible): OriginalUri,
) -> Result<Html<String>, MarqueeAxumError> {
    let tenant = tenant_or_404(&state, &tenant)?;
    Ok(Html(format!(
        "<h1>{tenant}</h1><p>page: /{}</p><p>url: {}</p>",
        escape_html(&rest),
        escape_html(visible.path())
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub redirect: Option<String>,
}

/// Login page. The return target is only honored for same-site paths.
pub async fn login(Query(query): Query<LoginQuery>) -> Html<String> {
    let target = query
        .redirect
        .as_deref()
        .and_then(same_site_path)
        .unwrap_or("/");
    Html(format!(
        "<h1>Sign in</h1><p>continue to: {}</p>",
        escape_html(target)
    ))
}

pub async fn unauthorized() -> Html<&'static str> {
    Html("<h1>Unauthorized</h1><p>Your account may not open this page.</p>")
}

pub async fn health() -> &'static str {
    "ok"
}

fn greeting(CurrentIdentity(identity): &CurrentIdentity) -> String {
    match identity {
        Some(user) => format!(
            "signed in as {}",
            escape_html(user.email.as_deref().unwrap_or(user.id.as_str()))
        ),
        None => "browsing anonymously".to_string(),
    }
}
