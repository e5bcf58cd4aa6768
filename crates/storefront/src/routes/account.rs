//! Account profile route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{LOGIN_PATH, RequireAuth, set_current_user};
use crate::models::CurrentUser;
use crate::routes::PageContext;
use crate::services::FieldErrors;
use crate::services::account::{ProfileForm, ProfileSaveError, ProfileUpdate, save_profile};
use crate::services::catalog::ImageUpload;
use crate::state::AppState;

/// Query flags for the profile page.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    #[serde(default)]
    pub saved: Option<String>,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub form: ProfileForm,
    /// Stored picture, relative to `/media`.
    pub image: Option<String>,
    pub role_label: &'static str,
    pub errors: FieldErrors,
    pub saved: bool,
}

/// Display the profile form.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    page: PageContext,
    Query(query): Query<ProfileQuery>,
) -> Result<Response> {
    let users = UserRepository::new(state.pool());
    let Some(user) = users.get_by_id(current.id).await? else {
        // Account deleted since login
        session.flush().await?;
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };
    let profile = users.get_profile(user.id).await?;

    Ok(ProfileTemplate {
        page,
        form: ProfileForm::from_user(&user, &profile),
        image: profile.image,
        role_label: user.role.label(),
        errors: FieldErrors::new(),
        saved: query.saved.is_some(),
    }
    .into_response())
}

/// Read the multipart profile form. An empty file input means no new picture.
async fn read_profile_multipart(
    mut multipart: Multipart,
) -> Result<(ProfileForm, Option<ImageUpload>)> {
    let mut form = ProfileForm::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                upload = Some(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "username" => form.username = value,
            "email" => form.email = value,
            "address" => form.address = value,
            "phone" => form.phone = value,
            "clear_image" => form.clear_image = !value.is_empty(),
            _ => {}
        }
    }

    Ok((form, upload))
}

/// Handle profile form submission (multipart, with an optional picture).
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response> {
    let (form, upload) = read_profile_multipart(multipart).await?;
    let users = UserRepository::new(state.pool());
    let image = users.get_profile(current.id).await?.image;

    let rerender = |page: PageContext, form: ProfileForm, errors: FieldErrors| {
        ProfileTemplate {
            page,
            form,
            image: image.clone(),
            role_label: current.role.label(),
            errors,
            saved: false,
        }
        .into_response()
    };

    let update = match ProfileUpdate::validate(&form, upload, state.config().max_upload_bytes) {
        Ok(update) => update,
        Err(errors) => return Ok(rerender(page, form, errors)),
    };
    let username = update.username.clone();

    match save_profile(state.pool(), state.media(), current.id, update).await {
        Ok(()) => {}
        Err(ProfileSaveError::UsernameTaken(errors)) => return Ok(rerender(page, form, errors)),
        Err(ProfileSaveError::Repository(e)) => return Err(AppError::Database(e)),
        Err(ProfileSaveError::Media(e)) => return Err(AppError::Media(e)),
    }

    let refreshed = CurrentUser {
        username,
        ..current.clone()
    };
    set_current_user(&session, &refreshed).await?;

    Ok(Redirect::to("/account?saved=1").into_response())
}
