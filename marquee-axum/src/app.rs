use std::convert::Infallible;

use axum::body::Body;
use axum::extract::Request;
use axum::handler::Handler;
use axum::http::Response;
use axum::response::Response as AxumResponse;
use axum::routing::{get, MethodRouter};
use axum::Router;
use marquee_auth::IdentityService;
use marquee_core::DispatchConfig;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middlewares::DispatchLayer;
use crate::DispatchState;

/// The fully layered application: request id, tracing, dispatch, router.
pub type MarqueeService = BoxCloneSyncService<Request, AxumResponse, Infallible>;

#[derive(Clone)]
pub struct MarqueeApp {
    pub state: DispatchState,
    pub router: Router<()>,
}

impl MarqueeApp {
    pub fn new(state: DispatchState) -> Self {
        Self {
            state,
            router: Router::new(),
        }
    }

    pub fn from_config(config: &DispatchConfig, identity: IdentityService) -> Self {
        Self::new(DispatchState::from_config(config, identity))
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.router = self.router.nest(path, router);
        self
    }

    pub fn merge(mut self, router: Router<()>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter<()>) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn use_get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + Sync + 'static,
        T: 'static,
    {
        self.route(path, get(handler))
    }

    /// Wrap the router. Dispatch runs outside routing so rewritten paths
    /// are what the router matches.
    pub fn into_service(self) -> MarqueeService {
        let svc = ServiceBuilder::new()
            .map_response(|res: Response<_>| res.map(Body::new))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(DispatchLayer::new(self.state))
            .service(self.router);
        BoxCloneSyncService::new(svc)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        let svc = self.into_service();
        axum::serve(listener, axum::ServiceExt::<Request>::into_make_service(svc)).await?;
        Ok(())
    }
}
