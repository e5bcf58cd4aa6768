//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user, or a staff user, in
//! route handlers. Both re-read the account on every request, so a role
//! change or a deleted account takes effect without a new login.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Login page path.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires authentication.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires an inventory manager or admin.
///
/// Anonymous users are redirected to the login page; customers get 403.
pub struct RequireStaff(pub CurrentUser);

/// Error returned when authentication or a staff role is required.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// Logged in, but the role is not allowed.
    Forbidden,
    /// No session layer on this route.
    MissingSession,
    /// The account could not be loaded.
    Internal,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            Self::MissingSession | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn current_user(
    parts: &Parts,
    state: &AppState,
) -> Result<Option<CurrentUser>, AuthRejection> {
    // Get the session from extensions (set by SessionManagerLayer)
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::MissingSession)?;

    let Some(stored) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let account = UserRepository::new(state.pool())
        .get_by_id(stored.id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %stored.id, "failed to load session user");
            AuthRejection::Internal
        })?;

    let Some(account) = account else {
        tracing::info!(user_id = %stored.id, "session user no longer exists");
        if let Err(e) = session
            .remove::<CurrentUser>(session_keys::CURRENT_USER)
            .await
        {
            tracing::warn!(error = %e, "failed to clear stale session user");
        }
        return Ok(None);
    };

    let fresh = CurrentUser::from(&account);
    if fresh.role != stored.role || fresh.username != stored.username {
        tracing::info!(user_id = %fresh.id, role = %fresh.role, "session user refreshed");
        set_current_user(session, &fresh).await.map_err(|e| {
            tracing::error!(error = %e, "failed to refresh session user");
            AuthRejection::Internal
        })?;
    }

    Ok(Some(fresh))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        current_user(parts, state)
            .await?
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = current_user(parts, state)
            .await?
            .ok_or(AuthRejection::RedirectToLogin)?;

        if user.role.is_staff() {
            Ok(Self(user))
        } else {
            tracing::debug!(user_id = %user.id, role = %user.role, "staff route refused");
            Err(AuthRejection::Forbidden)
        }
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
