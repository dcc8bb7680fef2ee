//! Middleware stack for the gateway.
//!
//! Layer order: Request → RequestContext → Cors → Timeout → BodyLimit → Handler
//!
//! Session resolution is not a layer: handlers that need a caller take a
//! [`CurrentUser`] argument, which rejects with 401 on its own.

pub mod cors;
pub mod request_context;
pub mod session;

pub use cors::create_cors_layer;
pub use request_context::request_context;
pub use session::{clear_session_cookie, read_cookie, session_cookie, CurrentUser};
