use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::OriginalUri;
use axum::http::{HeaderValue, Request, StatusCode, Uri};
use axum::routing::get;
use axum::Json;
use http_body_util::BodyExt;
use marquee_auth::{IdentityService, SessionOptions, StaticValidator};
use marquee_axum::{
    CurrentIdentity, CurrentTenant, DispatchState, MarqueeApp, MarqueeService,
};
use marquee_core::{
    AuthGate, CredentialValidator, Credentials, DispatchConfig, Dispatcher, Identity,
    MarqueeError, PathRewriter, RequestFacts, Role, TenantStage, TenantTag,
};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn echo(
    OriginalUri(visible): OriginalUri,
    CurrentTenant(tag): CurrentTenant,
    uri: Uri,
) -> Json<Value> {
    Json(json!({
        "tenant": tag.tenant().map(|t| t.as_str().to_string()),
        "label": tag.label(),
        "path": uri.path(),
        "query": uri.query(),
        "visible": visible.path(),
    }))
}

async fn whoami(CurrentIdentity(identity): CurrentIdentity) -> Json<Value> {
    Json(json!({ "id": identity.map(|i| i.id) }))
}

fn service_with(validator: Arc<dyn CredentialValidator>, debug: bool) -> MarqueeService {
    let identity = IdentityService::new(validator, SessionOptions::default());
    let state = DispatchState::new(Dispatcher::from_config(&DispatchConfig::default()), identity)
        .with_debug_headers(debug);
    MarqueeApp::new(state)
        .route("/", get(echo))
        .route("/{tenant}", get(echo))
        .route("/{tenant}/{*rest}", get(echo))
        .route("/auth", get(echo))
        .route("/admin", get(whoami))
        .route("/api/admin/{*rest}", get(whoami))
        .into_service()
}

fn service() -> MarqueeService {
    let tokens = StaticValidator::new()
        .with_token("user-token", Identity::new("u-1", Role::User))
        .with_token("admin-token", Identity::new("a-1", Role::Admin));
    service_with(Arc::new(tokens), false)
}

fn get_req(host: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri).header("host", host)
}

async fn call(svc: MarqueeService, req: axum::http::request::Builder) -> axum::response::Response {
    svc.oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn location(res: &axum::response::Response) -> &str {
    res.headers().get("location").unwrap().to_str().unwrap()
}

#[tokio::test]
async fn production_host_rewrites_to_tenant_route() {
    let res = call(service(), get_req("mariaocampo.se", "/shop?sort=price")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["tenant"], "maria");
    assert_eq!(body["path"], "/maria/shop");
    assert_eq!(body["query"], "sort=price");
    assert_eq!(body["visible"], "/shop");
}

#[tokio::test]
async fn www_root_is_rewritten_to_tenant_home() {
    let body = json_body(call(service(), get_req("www.cranmer.se", "/")).await).await;
    assert_eq!(body["tenant"], "danny");
    assert_eq!(body["path"], "/danny");
}

#[tokio::test]
async fn dev_query_override_selects_tenant() {
    let body = json_body(call(service(), get_req("localhost:5173", "/products?domain=rikuy")).await).await;
    assert_eq!(body["tenant"], "rikuy");
    assert_eq!(body["path"], "/rikuy/products");
    assert_eq!(body["query"], "domain=rikuy");
}

#[tokio::test]
async fn dev_cookie_override_and_landing_page() {
    let res = call(
        service(),
        get_req("localhost", "/about").header("cookie", "dev-domain-preference=maria"),
    )
    .await;
    assert_eq!(json_body(res).await["path"], "/maria/about");

    let body = json_body(call(service(), get_req("localhost", "/?domain=rikuy")).await).await;
    assert_eq!(body["label"], "none (dev landing)");
    assert_eq!(body["path"], "/");
}

#[tokio::test]
async fn unknown_host_uses_fallback_tenant() {
    let body = json_body(call(service(), get_req("unknown-domain.com", "/x")).await).await;
    assert_eq!(body["tenant"], "rikuy");
    assert_eq!(body["path"], "/rikuy/x");
}

#[tokio::test]
async fn root_routes_keep_their_path() {
    let body = json_body(call(service(), get_req("mariaocampo.se", "/auth")).await).await;
    assert_eq!(body["label"], "none (root route)");
    assert_eq!(body["path"], "/auth");
}

#[tokio::test]
async fn protected_prefix_sends_anonymous_home() {
    let res = call(service(), get_req("mariaocampo.se", "/arkiv/2024")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");

    let res = call(
        service(),
        get_req("mariaocampo.se", "/arkiv/2024").header("authorization", "Bearer user-token"),
    )
    .await;
    assert_eq!(json_body(res).await["path"], "/maria/arkiv/2024");
}

#[tokio::test]
async fn signed_in_user_is_sent_away_from_login() {
    let res = call(
        service(),
        get_req("cranmer.se", "/auth").header("authorization", "Bearer user-token"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/");
}

#[tokio::test]
async fn admin_pages_redirect_by_identity() {
    let res = call(service(), get_req("cranmer.se", "/admin")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/auth?redirect=/admin");

    let res = call(
        service(),
        get_req("cranmer.se", "/admin").header("authorization", "Bearer user-token"),
    )
    .await;
    assert_eq!(location(&res), "/auth/unauthorized");

    let res = call(
        service(),
        get_req("cranmer.se", "/admin").header("authorization", "Bearer admin-token"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["id"], "a-1");
}

#[tokio::test]
async fn admin_api_denials_are_json_errors() {
    let res = call(service(), get_req("cranmer.se", "/api/admin/orders")).await;
    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["code"], 401);
    assert_eq!(body["className"], "not-authenticated");

    let res = call(
        service(),
        get_req("cranmer.se", "/api/admin/orders").header("authorization", "Bearer user-token"),
    )
    .await;
    assert_eq!(res.status().as_u16(), 403);
    assert_eq!(json_body(res).await["className"], "forbidden");
}

struct Counting(AtomicUsize);

#[async_trait::async_trait]
impl CredentialValidator for Counting {
    async fn validate(&self, _c: &Credentials) -> anyhow::Result<Option<Identity>> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Identity::new("a-1", Role::Admin)))
    }
}

#[tokio::test]
async fn identity_is_validated_once_per_request() {
    let counting = Arc::new(Counting(AtomicUsize::new(0)));
    let svc = service_with(counting.clone(), false);
    let res = call(svc, get_req("cranmer.se", "/admin").header("authorization", "Bearer t")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["id"], "a-1");
    assert_eq!(counting.0.load(Ordering::SeqCst), 1);
}

struct Unreachable;

#[async_trait::async_trait]
impl CredentialValidator for Unreachable {
    async fn validate(&self, _c: &Credentials) -> anyhow::Result<Option<Identity>> {
        Err(MarqueeError::bad_gateway("identity provider unavailable").into_anyhow())
    }
}

#[tokio::test]
async fn validator_failure_is_bad_gateway() {
    let svc = service_with(Arc::new(Unreachable), false);
    let res = call(svc, get_req("cranmer.se", "/admin").header("authorization", "Bearer t")).await;
    assert_eq!(res.status().as_u16(), 502);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadGateway");
    assert_eq!(body["className"], "bad-gateway");

    // Pages that never ask for the identity are unaffected.
    let svc = service_with(Arc::new(Unreachable), false);
    let res = call(svc, get_req("cranmer.se", "/shop").header("authorization", "Bearer t")).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_set_and_preserved() {
    let res = call(service(), get_req("cranmer.se", "/shop")).await;
    assert!(res.headers().get("x-request-id").is_some());

    let provided = HeaderValue::from_static("req-test-123");
    let res = call(
        service(),
        get_req("cranmer.se", "/admin").header("x-request-id", provided.clone()),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn debug_headers_describe_the_decision() {
    let svc = service_with(Arc::new(StaticValidator::new()), true);
    let res = call(svc, get_req("www.mariaocampo.se", "/shop")).await;
    assert_eq!(res.headers().get("x-debug-host").unwrap(), "www.mariaocampo.se");
    assert_eq!(res.headers().get("x-debug-pathname").unwrap(), "/shop");
    assert_eq!(res.headers().get("x-debug-domain").unwrap(), "maria");

    let res = call(service(), get_req("mariaocampo.se", "/shop")).await;
    assert!(res.headers().get("x-debug-domain").is_none());
}

struct CountingTenants(Arc<AtomicUsize>, Dispatcher);

impl TenantStage for CountingTenants {
    fn resolve(&self, facts: &RequestFacts) -> TenantTag {
        self.0.fetch_add(1, Ordering::SeqCst);
        self.1.route(facts).tenant
    }
}

#[tokio::test]
async fn debug_headers_reuse_the_single_routing_decision() {
    let resolved = Arc::new(AtomicUsize::new(0));
    let config = DispatchConfig::default();
    let dispatcher = Dispatcher::builder()
        .tenants(CountingTenants(resolved.clone(), Dispatcher::from_config(&config)))
        .rewrite(PathRewriter::new(config.root_routes.clone()))
        .gate(AuthGate::new(config.gate.clone()))
        .build();
    let state =
        DispatchState::new(dispatcher, IdentityService::anonymous()).with_debug_headers(true);
    let svc = MarqueeApp::new(state)
        .route("/{tenant}/{*rest}", get(echo))
        .into_service();

    // A gate redirect still carries the tenant that was resolved once.
    let res = call(
        svc,
        get_req("cranmer.se", "/arkiv/7").header("cookie", "dev-domain-preference=maria"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers().get("x-debug-domain").unwrap(), "danny");
    assert_eq!(resolved.load(Ordering::SeqCst), 1);
}
