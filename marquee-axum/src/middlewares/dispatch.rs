//! Tenant dispatch as a tower middleware.
//!
//! The layer must wrap the whole [`axum::Router`], not be added with
//! `Router::layer`: the URI rewrite has to happen before route matching.
//!
//! Per request it:
//! - builds [`RequestFacts`] from the `Host` header (or URI authority),
//!   path, query and cookies
//! - creates a memoized [`RequestSession`] and stores it in the request
//!   extensions as `Arc<RequestSession>`
//! - routes once with the [`Dispatcher`](marquee_core::Dispatcher), then
//!   runs the gate on that decision
//! - on proceed, stores the [`TenantTag`] and [`Routed`], keeps the
//!   visible URI as [`OriginalUri`] and swaps in the rewritten one
//! - on redirect, answers `303 See Other`; on error, a JSON error body

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{OriginalUri, Request},
    http::{header::HOST, uri::PathAndQuery, HeaderName, HeaderValue, Uri},
    response::{IntoResponse, Redirect as AxumRedirect, Response},
};
use marquee_core::{
    errors::MarqueeError, Dispatch, RequestFacts, RequestSession, Rewrite, Routed, TenantTag,
};
use tower::{Layer, Service};
use tracing::debug;

use crate::error::MarqueeAxumError;
use crate::state::DispatchState;

pub const X_DEBUG_HOST: HeaderName = HeaderName::from_static("x-debug-host");
pub const X_DEBUG_PATHNAME: HeaderName = HeaderName::from_static("x-debug-pathname");
pub const X_DEBUG_DOMAIN: HeaderName = HeaderName::from_static("x-debug-domain");

#[derive(Clone)]
pub struct DispatchLayer {
    state: DispatchState,
}

impl DispatchLayer {
    pub fn new(state: DispatchState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for DispatchLayer {
    type Service = DispatchService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DispatchService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DispatchService<S> {
    inner: S,
    state: DispatchState,
}

impl<S> Service<Request<Body>> for DispatchService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();

        Box::pin(async move {
            let facts = request_facts(&req);
            let routed = state.dispatcher.route(&facts);
            let debug_headers = state
                .debug_headers
                .then(|| debug_values(&facts, &routed.tenant));

            let session = Arc::new(state.identity.session(req.headers()));
            let outcome = state
                .dispatcher
                .dispatch_routed(&facts, routed, &session)
                .await;

            let mut response = match outcome {
                Ok(Dispatch::Proceed(routed)) => match apply_route(&mut req, routed, session) {
                    Ok(()) => inner.call(req).await?,
                    Err(e) => MarqueeAxumError::from(e).into_response(),
                },
                Ok(Dispatch::Redirect(r)) => AxumRedirect::to(&r.location).into_response(),
                Err(e) => {
                    debug!(path = %facts.path, error = %e, "request rejected");
                    MarqueeAxumError(e).into_response()
                }
            };

            if let Some(values) = debug_headers {
                let headers = response.headers_mut();
                for (name, value) in values {
                    headers.insert(name, value);
                }
            }
            Ok(response)
        })
    }
}

/// The dispatch inputs visible on an HTTP request. Browsers never send
/// the fragment, so it is always empty here.
pub fn request_facts(req: &Request<Body>) -> RequestFacts {
    let host = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();

    let mut facts = RequestFacts::new(host, req.uri().path());
    if let Some(q) = req.uri().query() {
        facts = facts.with_query(q);
    }
    for value in req.headers().get_all(axum::http::header::COOKIE) {
        if let Ok(raw) = value.to_str() {
            facts = facts.with_cookie_header(raw);
        }
    }
    facts
}

fn apply_route(
    req: &mut Request<Body>,
    routed: Routed,
    session: Arc<RequestSession>,
) -> Result<(), MarqueeError> {
    let original = req.uri().clone();
    if let Rewrite::To(target) = &routed.rewrite {
        *req.uri_mut() = rewrite_uri(&original, target)?;
    }

    let ext = req.extensions_mut();
    if ext.get::<OriginalUri>().is_none() {
        ext.insert(OriginalUri(original));
    }
    ext.insert(routed.tenant.clone());
    ext.insert(routed);
    ext.insert(session);
    Ok(())
}

fn rewrite_uri(original: &Uri, target: &str) -> Result<Uri, MarqueeError> {
    let mut parts = original.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(target)
            .map_err(|e| MarqueeError::bad_request(format!("unroutable path: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| MarqueeError::bad_request(format!("unroutable path: {e}")))
}

fn debug_values(facts: &RequestFacts, tenant: &TenantTag) -> Vec<(HeaderName, HeaderValue)> {
    [
        (X_DEBUG_HOST, facts.host.clone()),
        (X_DEBUG_PATHNAME, facts.path.clone()),
        (X_DEBUG_DOMAIN, tenant.label()),
    ]
    .into_iter()
    .filter_map(|(name, value)| HeaderValue::try_from(value).ok().map(|v| (name, v)))
    .collect()
}
