//! Per-session serialization of mutating requests.
//!
//! Handlers read the cart from the session, change it and write it back. Two
//! concurrent POSTs on the same session would otherwise both read the old
//! cart and one update would be lost. This layer must sit outside the
//! session layer so the lock covers the session store write.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, header::COOKIE},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::cookie::Cookie;

use crate::middleware::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Async mutexes keyed by session cookie value.
///
/// Entries expire only after sitting idle, never by count, so a lock held by
/// an in-flight request is never swapped for a fresh one.
#[derive(Clone)]
pub struct SessionLocks {
    cache: Cache<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .time_to_idle(Duration::from_secs(600))
            .build();
        Self { cache }
    }

    /// The lock for a session, created on first use.
    pub async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.cache
            .get_with(session_id.to_owned(), async { Arc::new(Mutex::new(())) })
            .await
    }
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of the session cookie, if the request carries one.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_owned())
}

/// Hold the session's lock for the whole of a non-GET/HEAD request.
///
/// Requests without a session cookie have nothing to race on and pass
/// straight through.
pub async fn session_lock_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let Some(session_id) = session_cookie(request.headers()) else {
        return next.run(request).await;
    };

    let lock = state.session_locks().lock_for(&session_id).await;
    let _guard = lock.lock().await;
    next.run(request).await
}
