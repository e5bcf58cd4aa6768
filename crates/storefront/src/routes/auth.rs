//! Authentication route handlers.
//!
//! Handles signup, username/password login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::Role;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{LOGIN_PATH, set_current_user};
use crate::models::CurrentUser;
use crate::routes::PageContext;
use crate::services::auth::{self, AuthError, AuthService, Registration, SignupInput};
use crate::services::FieldErrors;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Signup form data.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
    #[serde(default)]
    pub role: String,
}

impl SignupForm {
    fn input(&self) -> SignupInput<'_> {
        SignupInput {
            username: &self.username,
            email: &self.email,
            password1: &self.password1,
            password2: &self.password2,
            role: &self.role,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub error: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
    pub username: String,
    pub email: String,
    pub role: String,
    pub roles: &'static [Role],
    pub errors: FieldErrors,
}

impl SignupTemplate {
    fn new(page: PageContext, form: &SignupForm, errors: FieldErrors) -> Self {
        Self {
            page,
            username: form.username.clone(),
            email: form.email.clone(),
            role: form.role.clone(),
            roles: &Role::SELF_SERVICE,
            errors,
        }
    }
}

// =============================================================================
// Signup Routes
// =============================================================================

/// Display the signup page.
pub async fn signup_page(page: PageContext) -> SignupTemplate {
    let form = SignupForm {
        role: Role::Customer.as_str().to_owned(),
        ..SignupForm::default()
    };
    SignupTemplate::new(page, &form, FieldErrors::new())
}

/// Handle signup form submission.
///
/// On success the user is sent to the login page; on failure the form is
/// shown again with a message per failing field.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn signup(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let registration = match Registration::from_signup(form.input()) {
        Ok(registration) => registration,
        Err(errors) => return Ok(SignupTemplate::new(page, &form, errors).into_response()),
    };

    match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, role = %user.role, "account created");
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(e @ AuthError::UserAlreadyExists) => {
            let mut errors = FieldErrors::new();
            errors.add("username", auth::message(&e));
            Ok(SignupTemplate::new(page, &form, errors).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext) -> LoginTemplate {
    LoginTemplate {
        page,
        username: String::new(),
        error: None,
    }
}

/// Handle login form submission.
///
/// The session ID is cycled on success to prevent fixation; the cart
/// survives the cycle.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e @ AuthError::InvalidCredentials) => {
            tracing::info!("login failed");
            return Ok(LoginTemplate {
                page,
                username: form.username,
                error: Some(auth::message(&e)),
            }
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    session.cycle_id().await?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    set_sentry_user(&user.id, &user.username);
    tracing::info!(user_id = %user.id, "logged in");

    Ok(Redirect::to("/").into_response())
}

/// Handle logout: drop the whole session, cart included.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    clear_sentry_user();
    Ok(Redirect::to("/"))
}
