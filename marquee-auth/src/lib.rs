// Session credentials and identity validators for Marquee.

pub mod core;
pub mod error;
pub mod gotrue;
pub mod jwt;
pub mod memory;
pub mod options;
pub mod service;

pub use crate::core::{decode_session_value, extract_bearer_token, extract_credentials, request_cookies, session_cookie_value};
pub use error::CredentialError;
pub use gotrue::GotrueValidator;
pub use jwt::JwtValidator;
pub use memory::StaticValidator;
pub use options::*;
pub use service::IdentityService;
