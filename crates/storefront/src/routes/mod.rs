//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page (newest items, categories)
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (database)
//!
//! # Auth
//! GET  /signup                   - Signup page
//! POST /signup                   - Signup action
//! GET  /login                    - Login page
//! POST /login                    - Login action
//! POST /logout                   - Logout action
//!
//! # Account (requires auth)
//! GET  /account                  - Profile form
//! POST /account                  - Profile update, multipart
//!
//! # Items
//! GET  /items                    - Browse (query, category*, page; AJAX returns JSON)
//! GET  /items/new                - Create form (staff)
//! POST /items/new                - Create action, multipart (staff)
//! GET  /items/export-csv         - CSV download (staff)
//! GET  /items/{id}               - Item detail
//! GET  /items/{id}/edit          - Edit form (owner or admin)
//! POST /items/{id}/edit          - Edit action (owner or admin)
//! GET  /items/{id}/delete        - Delete confirmation (owner or admin)
//! POST /items/{id}/delete        - Delete action (owner or admin)
//!
//! # Dashboard
//! GET  /dashboard                - Own items, 6 per page (staff)
//!
//! # Cart
//! GET  /cart                     - Cart with totals
//! POST /cart/add/{id}            - Add one unit
//! POST /cart/remove/{id}         - Remove line
//! POST /cart/increase/{id}       - Increment quantity
//! POST /cart/decrease/{id}       - Decrement quantity
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod items;
pub mod page;

pub use page::{PageContext, PageLink, Pagination};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::services::catalog::MAX_IMAGES;
use crate::state::AppState;

/// Allowance for the text fields and multipart framing of upload forms.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the item routes router.
///
/// `max_upload_bytes` is the per-image limit; the create form may carry
/// three images.
pub fn item_routes(max_upload_bytes: usize) -> Router<AppState> {
    let create_limit = max_upload_bytes
        .saturating_mul(MAX_IMAGES)
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(items::browse))
        .route(
            "/new",
            get(items::new_page)
                .post(items::create)
                .layer(DefaultBodyLimit::max(create_limit)),
        )
        .route("/export-csv", get(items::export_csv))
        .route("/{id}", get(items::detail))
        .route("/{id}/edit", get(items::edit_page).post(items::edit))
        .route("/{id}/delete", get(items::delete_page).post(items::delete))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{id}", post(cart::add))
        .route("/remove/{id}", post(cart::remove))
        .route("/increase/{id}", post(cart::increase))
        .route("/decrease/{id}", post(cart::decrease))
}

/// Create all routes for the storefront.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(auth_routes())
        .route(
            "/account",
            get(account::show)
                .post(account::update)
                .layer(DefaultBodyLimit::max(
                    max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
                )),
        )
        .nest("/items", item_routes(max_upload_bytes))
        .route("/dashboard", get(dashboard::index))
        .nest("/cart", cart_routes())
}
