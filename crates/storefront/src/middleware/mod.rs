//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions)
//! 6. CSRF token issue (mint per-session token, echo in response header)
//! 7. CSRF verification (route layer on state-changing routes)

pub mod auth;
mod context;
pub mod csrf;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::RequireAuth;
pub use csrf::{CsrfToken, csrf_token_middleware, require_csrf};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
