//! marquee-axum: axum adapter for the Marquee dispatch pipeline.
//!
//! ```ignore
//! let app = MarqueeApp::from_config(&config, identity)
//!     .use_get("/{tenant}", tenant_home);
//! app.listen("0.0.0.0:3000").await?;
//! ```

pub mod app;
pub mod extract;
pub mod middlewares;
mod error;
mod state;

pub use app::{MarqueeApp, MarqueeService};
pub use error::MarqueeAxumError;
pub use extract::{CurrentIdentity, CurrentRoute, CurrentTenant};
pub use middlewares::{DispatchLayer, DispatchService};
pub use state::DispatchState;

pub use axum;
