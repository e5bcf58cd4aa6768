//! Staff dashboard: the current user's own items.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::Paginator;

use crate::db::ItemRepository;
use crate::error::Result;
use crate::middleware::RequireStaff;
use crate::models::ItemSummary;
use crate::routes::{PageContext, Pagination};
use crate::state::AppState;

/// Items per dashboard page.
pub const DASHBOARD_PAGE_SIZE: u32 = 6;

/// Dashboard query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<String>,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub items: Vec<ItemSummary>,
    pub total: u64,
    pub pagination: Pagination,
}

/// List the items the current user created, sold ones included.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    page: PageContext,
    Query(query): Query<DashboardQuery>,
) -> Result<DashboardTemplate> {
    let repo = ItemRepository::new(state.pool());
    let total = repo.count_by_owner(user.id).await?;
    let window = Paginator::new(total, DASHBOARD_PAGE_SIZE).page(query.page.as_deref());
    let items = repo.list_by_owner(user.id, &window).await?;

    Ok(DashboardTemplate {
        page,
        items,
        total,
        pagination: Pagination::new(&window, "/dashboard?"),
    })
}
