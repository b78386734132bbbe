//! Handler-side access to what the dispatch layer decided.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use marquee_core::{errors::MarqueeError, Identity, RequestSession, Routed, TenantId, TenantTag};

use crate::error::MarqueeAxumError;

fn missing_layer() -> MarqueeAxumError {
    MarqueeError::general_error("dispatch layer is not installed").into()
}

/// The tenant tag for this request.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub TenantTag);

impl CurrentTenant {
    pub fn tenant(&self) -> Option<&TenantId> {
        self.0.tenant()
    }
}

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = MarqueeAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantTag>()
            .cloned()
            .map(CurrentTenant)
            .ok_or_else(missing_layer)
    }
}

/// Tenant tag plus the rewrite that was applied.
#[derive(Debug, Clone)]
pub struct CurrentRoute(pub Routed);

impl<S> FromRequestParts<S> for CurrentRoute
where
    S: Send + Sync,
{
    type Rejection = MarqueeAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Routed>()
            .cloned()
            .map(CurrentRoute)
            .ok_or_else(missing_layer)
    }
}

/// The signed-in user, if any.
///
/// Reads the request's memoized session: when the gate already looked
/// the user up, the validator is not called again.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = MarqueeAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Arc<RequestSession>>()
            .cloned()
            .ok_or_else(missing_layer)?;
        let identity = session.identity().await?.cloned();
        Ok(CurrentIdentity(identity))
    }
}
