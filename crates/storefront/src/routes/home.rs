//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::{CategoryRepository, ItemRepository};
use crate::error::Result;
use crate::models::{Category, ItemSummary};
use crate::routes::PageContext;
use crate::state::AppState;

/// Newest items shown on the home page.
const LATEST_ITEMS: u32 = 6;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub items: Vec<ItemSummary>,
    pub categories: Vec<Category>,
}

/// Display the home page: newest unsold items and every category.
#[instrument(skip_all)]
pub async fn home(State(state): State<AppState>, page: PageContext) -> Result<HomeTemplate> {
    let items = ItemRepository::new(state.pool()).latest(LATEST_ITEMS).await?;
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(HomeTemplate {
        page,
        items,
        categories,
    })
}
