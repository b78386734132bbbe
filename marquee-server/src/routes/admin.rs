use axum::extract::OriginalUri;
use axum::response::Html;
use axum::Json;
use marquee_axum::CurrentIdentity;
use serde_json::{json, Value};

/// Only reached when the gate admitted an admin.
pub async fn dashboard(CurrentIdentity(identity): CurrentIdentity) -> Html<String> {
    let who = identity
        .map(|u| format!("{} ({})", u.email.unwrap_or(u.id), u.role))
        .unwrap_or_default();
    Html(format!("<h1>Admin</h1><p>{who}</p>"))
}

pub async fn api(
    OriginalUri(uri): OriginalUri,
    CurrentIdentity(identity): CurrentIdentity,
) -> Json<Value> {
    Json(json!({
        "path": uri.path(),
        "user": identity.as_ref().map(|u| u.id.clone()),
        "role": identity.as_ref().map(|u| u.role.to_string()),
    }))
}
