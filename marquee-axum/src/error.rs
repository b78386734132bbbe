use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::errors::MarqueeError;

#[derive(Debug)]
pub struct MarqueeAxumError(pub anyhow::Error);

impl From<anyhow::Error> for MarqueeAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<MarqueeError> for MarqueeAxumError {
    fn from(e: MarqueeError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for MarqueeAxumError {
    fn into_response(self) -> Response {
        // A MarqueeError anywhere in the anyhow chain keeps its kind.
        if let Some(err) = MarqueeError::find(&self.0) {
            let safe = err.sanitize_for_client();
            let status =
                StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        let err = MarqueeError::general_error(self.0.to_string());
        let status = StatusCode::from_u16(err.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(err.to_json())).into_response()
    }
}
