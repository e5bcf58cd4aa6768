//! Router assembly, shared by the binary and the integration tests.

use axum::{Router, extract::Request, middleware as axum_middleware};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::middleware::{
    self, request_id_middleware, security_headers_middleware, session_lock_middleware,
};
use crate::routes;
use crate::state::AppState;

/// Build the full application: routes, static files, sessions and the
/// middleware stack, with trailing slashes trimmed before routing.
pub fn build_app(state: AppState, session_store: SqliteStore) -> NormalizePath<Router> {
    let config = state.config();
    let session_layer = middleware::create_session_layer(session_store, config);

    let router = Router::new()
        .merge(routes::routes(config.max_upload_bytes))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .nest_service("/media", ServeDir::new(&config.media_dir))
        .layer(session_layer)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session_lock_middleware,
        ))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        // request_id is filled in by request_id_middleware
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
