use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use marquee_core::MarqueeConfig;
use marquee_server::build_with;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> MarqueeConfig {
    let mut c = MarqueeConfig::new();
    c.set("dispatch.debug_headers", "true");
    c
}

fn with_provider(url: &str) -> MarqueeConfig {
    let mut c = config();
    c.set("auth.validator", "gotrue");
    c.set("auth.url", url);
    c.set("auth.anon_key", "anon");
    c.set("auth.timeout", "2s");
    c
}

async fn send(c: &MarqueeConfig, req: Request<Body>) -> axum::response::Response {
    let server = build_with(c).unwrap();
    server.app.into_service().oneshot(req).await.unwrap()
}

fn get(host: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("host", host)
        .body(Body::empty())
        .unwrap()
}

fn get_as(host: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("host", host)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn text_body(res: axum::response::Response) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let res = send(&config(), get("localhost", "/api/health")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    assert_eq!(text_body(res).await, "ok");
}

#[tokio::test]
async fn health_is_global_on_every_host() {
    let res = send(&config(), get("mariaocampo.se", "/api/health")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers().get("x-debug-domain").unwrap(), "none (root route)");
    assert_eq!(text_body(res).await, "ok");

    let req = Request::builder()
        .uri("/api/health")
        .header("host", "localhost")
        .header("cookie", "dev-domain-preference=danny")
        .body(Body::empty())
        .unwrap();
    assert_eq!(text_body(send(&config(), req).await).await, "ok");
}

#[tokio::test]
async fn production_hosts_serve_their_storefront() {
    let res = send(&config(), get("mariaocampo.se", "/shop")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers().get("x-debug-domain").unwrap(), "maria");
    let body = text_body(res).await;
    assert!(body.contains("<h1>maria</h1>"));
    assert!(body.contains("page: /shop"));
    assert!(body.contains("url: /shop"));

    let body = text_body(send(&config(), get("www.cranmer.se", "/")).await).await;
    assert!(body.contains("<h1>danny</h1>"));

    let body = text_body(send(&config(), get("unknown-domain.com", "/x")).await).await;
    assert!(body.contains("<h1>rikuy</h1>"));
}

#[tokio::test]
async fn dev_host_landing_and_overrides() {
    let res = send(&config(), get("localhost:3000", "/")).await;
    assert_eq!(res.headers().get("x-debug-domain").unwrap(), "none (dev landing)");
    let body = text_body(res).await;
    assert!(body.contains("/api/dev/tenant/maria?next=/maria"));

    let body = text_body(send(&config(), get("localhost", "/products?domain=rikuy")).await).await;
    assert!(body.contains("<h1>rikuy</h1>"));

    // No override on a development host: the path is not rewritten, and
    // `/products` is not a storefront.
    let res = send(&config(), get("localhost", "/products")).await;
    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await["className"], "not-found");
}

#[tokio::test]
async fn dev_tenant_endpoint_sets_preference_cookie() {
    let res = send(&config(), get("localhost", "/api/dev/tenant/maria?next=/maria")).await;
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers().get("location").unwrap(), "/maria");
    let cookie = res.headers().get("set-cookie").unwrap().to_str().unwrap();
    assert!(cookie.starts_with("dev-domain-preference=maria;"));

    for next in [
        "//evil.example",
        "/%5Cevil.example",
        "/%09/evil.example",
        "https://evil.example",
    ] {
        let uri = format!("/api/dev/tenant/maria?next={next}");
        let res = send(&config(), get("localhost", &uri)).await;
        assert_eq!(res.status().as_u16(), 303, "{next}");
        assert_eq!(res.headers().get("location").unwrap(), "/", "{next}");
    }

    let res = send(&config(), get("localhost", "/api/dev/tenant/nobody")).await;
    assert_eq!(res.status().as_u16(), 400);

    let req = Request::builder()
        .uri("/about")
        .header("host", "localhost")
        .header("cookie", "dev-domain-preference=maria")
        .body(Body::empty())
        .unwrap();
    assert!(text_body(send(&config(), req).await).await.contains("<h1>maria</h1>"));
}

#[tokio::test]
async fn login_page_escapes_and_checks_its_return_target() {
    let uri = "/auth?redirect=/admin/products%3Fpage%3D2";
    let res = send(&config(), get("cranmer.se", uri)).await;
    assert_eq!(res.status().as_u16(), 200);
    assert!(text_body(res).await.contains("continue to: /admin/products?page=2"));

    let uri = "/auth?redirect=/%3Cscript%3Ealert(1)%3C/script%3E";
    let body = text_body(send(&config(), get("cranmer.se", uri)).await).await;
    assert!(!body.contains("<script>"));
    assert!(body.contains("continue to: /&lt;script&gt;alert(1)&lt;/script&gt;"));

    let uri = "/auth?redirect=%3Cscript%3Ealert(1)%3C/script%3E";
    let body = text_body(send(&config(), get("cranmer.se", uri)).await).await;
    assert!(body.contains("continue to: /</p>"));

    let body = text_body(send(&config(), get("cranmer.se", "/%3Cb%3Ex")).await).await;
    assert!(body.contains("page: /&lt;b&gt;x"));
}

#[tokio::test]
async fn anonymous_visitors_are_gated() {
    let res = send(&config(), get("cranmer.se", "/arkiv")).await;
    assert_eq!(res.status().as_u16(), 303);
    assert_eq!(res.headers().get("location").unwrap(), "/");

    let res = send(&config(), get("cranmer.se", "/admin/products/create")).await;
    assert_eq!(
        res.headers().get("location").unwrap(),
        "/auth?redirect=/admin/products/create"
    );

    let res = send(&config(), get("cranmer.se", "/admin/products/?page=2")).await;
    assert_eq!(
        res.headers().get("location").unwrap(),
        "/auth?redirect=/admin/products/%3Fpage%3D2"
    );

    let res = send(&config(), get("cranmer.se", "/api/admin/orders")).await;
    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["code"], 401);
}

async fn provider_with_user(role: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "u-42",
            "email": "admin@cranmer.se",
            "app_metadata": { "role": role }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn provider_backed_admin_access() {
    let provider = provider_with_user("admin").await;
    let c = with_provider(&provider.uri());

    // Gate and handler share a single lookup (`expect(1)` above).
    let res = send(&c, get_as("cranmer.se", "/admin", "good")).await;
    assert_eq!(res.status().as_u16(), 200);
    assert!(text_body(res).await.contains("admin@cranmer.se (admin)"));

    let res = send(&c, get_as("cranmer.se", "/admin", "expired")).await;
    assert_eq!(res.headers().get("location").unwrap(), "/auth?redirect=/admin");
}

#[tokio::test]
async fn super_admin_only_users_api() {
    let provider = provider_with_user("admin").await;
    let c = with_provider(&provider.uri());
    let res = send(&c, get_as("cranmer.se", "/api/admin/users", "good")).await;
    assert_eq!(res.status().as_u16(), 403);
    assert_eq!(json_body(res).await["className"], "forbidden");
}

#[tokio::test]
async fn provider_outage_is_bad_gateway() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&provider)
        .await;
    let c = with_provider(&provider.uri());

    let res = send(&c, get_as("cranmer.se", "/api/admin/orders", "good")).await;
    assert_eq!(res.status().as_u16(), 502);
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadGateway");
    assert_eq!(body["className"], "bad-gateway");
}

#[test]
fn malformed_configuration_fails_build() {
    let mut c = config();
    c.set("tenants.hosts", "cranmer.se");
    assert!(build_with(&c).is_err());

    let mut c = config();
    c.set("auth.validator", "gotrue");
    assert!(build_with(&c).is_err());
}
