//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame options, etc.)
//! 5. Session lock (serialize mutating requests per session)
//! 6. Session layer (tower-sessions with `SQLite` store)

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_lock;

pub use auth::{AuthRejection, LOGIN_PATH, RequireAuth, RequireStaff, set_current_user};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{
    SESSION_COOKIE_NAME, create_session_layer, create_session_store, spawn_expired_deletion,
};
pub use session_lock::{SessionLocks, session_lock_middleware};
