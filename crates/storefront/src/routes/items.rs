//! Catalog route handlers: browse, detail, create, edit, delete and CSV export.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::{Multipart, Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::instrument;

use bazaar_core::{CategoryId, ItemId, Paginator};

use crate::db::items::BrowseFilter;
use crate::db::{CategoryRepository, ItemRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::models::{Category, CurrentUser, Item, ItemImage, ItemSummary};
use crate::routes::{PageContext, Pagination};
use crate::services::catalog::{
    CatalogError, CatalogService, ImageUpload, ItemFormInput, MAX_IMAGES, can_modify,
};
use crate::services::{FieldErrors, export};
use crate::state::AppState;

/// Items per browse page.
pub const BROWSE_PAGE_SIZE: u32 = 9;

/// Related items shown on the detail page.
const RELATED_ITEMS: u32 = 3;

/// Header set by the browse page script on its fetches.
const AJAX_HEADER: &str = "x-requested-with";

// =============================================================================
// Query Types
// =============================================================================

/// Browse parameters. `category` may repeat, so the raw query is parsed by hand.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BrowseParams {
    pub query: String,
    pub categories: Vec<CategoryId>,
    pub page: Option<String>,
}

impl BrowseParams {
    /// Parse a raw query string. Category values that aren't integers are ignored.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        let Some(raw) = raw else {
            return params;
        };

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "query" if params.query.is_empty() => params.query = value.trim().to_owned(),
                "category" => {
                    if let Ok(id) = value.trim().parse::<i64>() {
                        let id = CategoryId::new(id);
                        if !params.categories.contains(&id) {
                            params.categories.push(id);
                        }
                    }
                }
                "page" if params.page.is_none() => params.page = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    fn filter(&self) -> BrowseFilter {
        BrowseFilter {
            query: (!self.query.is_empty()).then(|| self.query.clone()),
            categories: self.categories.clone(),
        }
    }

    /// Query string of the filter alone.
    fn filter_query(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if !self.query.is_empty() {
            serializer.append_pair("query", &self.query);
        }
        for id in &self.categories {
            serializer.append_pair("category", &id.to_string());
        }
        serializer.finish()
    }
}

fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get(AJAX_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

// =============================================================================
// Templates
// =============================================================================

/// A category choice with its selection state.
pub struct CategoryOption {
    pub id: CategoryId,
    pub name: String,
    pub selected: bool,
}

impl CategoryOption {
    fn list(categories: Vec<Category>, selected: &[CategoryId]) -> Vec<Self> {
        categories
            .into_iter()
            .map(|c| Self {
                selected: selected.contains(&c.id),
                id: c.id,
                name: c.name,
            })
            .collect()
    }
}

/// Browse page template.
#[derive(Template, WebTemplate)]
#[template(path = "items/browse.html")]
pub struct BrowseTemplate {
    pub page: PageContext,
    pub items: Vec<ItemSummary>,
    pub query: String,
    pub categories: Vec<CategoryOption>,
    pub pagination: Pagination,
}

/// Item grid fragment, rendered alone for AJAX browse requests.
#[derive(Template)]
#[template(path = "items/item_list.html")]
pub struct ItemListTemplate {
    pub items: Vec<ItemSummary>,
}

/// JSON body for AJAX browse requests.
#[derive(Debug, Serialize)]
pub struct BrowseFragment {
    pub html_content: String,
    #[serde(rename = "numPages")]
    pub num_pages: u32,
}

/// Item detail template.
#[derive(Template, WebTemplate)]
#[template(path = "items/detail.html")]
pub struct DetailTemplate {
    pub page: PageContext,
    pub item: Item,
    pub images: Vec<ItemImage>,
    pub related: Vec<ItemSummary>,
    pub can_modify: bool,
}

/// Create / edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "items/form.html")]
pub struct ItemFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    /// Create form: category select and image inputs.
    pub is_new: bool,
    pub categories: Vec<CategoryOption>,
    pub form: ItemFormInput,
    pub errors: FieldErrors,
    pub max_images: usize,
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "items/delete.html")]
pub struct DeleteTemplate {
    pub page: PageContext,
    pub item: Item,
}

fn form_response(template: ItemFormTemplate) -> Response {
    if template.errors.is_empty() {
        template.into_response()
    } else {
        (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
    }
}

// =============================================================================
// Browse and Detail
// =============================================================================

/// Browse unsold items with text and category filters, nine per page.
///
/// AJAX requests get `{ "html_content", "numPages" }` instead of a page.
#[instrument(skip_all)]
pub async fn browse(
    State(state): State<AppState>,
    headers: HeaderMap,
    page: PageContext,
    RawQuery(raw): RawQuery,
) -> Result<Response> {
    let params = BrowseParams::parse(raw.as_deref());
    let filter = params.filter();
    let repo = ItemRepository::new(state.pool());

    let total = repo.count_browse(&filter).await?;
    let window = Paginator::new(total, BROWSE_PAGE_SIZE).page(params.page.as_deref());
    let items = repo.browse(&filter, &window).await?;

    tracing::debug!(
        total,
        page = window.number,
        categories = params.categories.len(),
        "browse"
    );

    if is_ajax(&headers) {
        let html_content = ItemListTemplate { items }.render()?;
        return Ok(Json(BrowseFragment {
            html_content,
            num_pages: window.num_pages,
        })
        .into_response());
    }

    let categories = CategoryRepository::new(state.pool()).list().await?;

    let filter_query = params.filter_query();
    let base = if filter_query.is_empty() {
        "/items?".to_owned()
    } else {
        format!("/items?{filter_query}&")
    };

    Ok(BrowseTemplate {
        page,
        items,
        categories: CategoryOption::list(categories, &params.categories),
        query: params.query,
        pagination: Pagination::new(&window, &base),
    }
    .into_response())
}

async fn load_item(state: &AppState, id: ItemId) -> Result<Item> {
    ItemRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("item {id}")))
}

/// Item detail with images and related items from the same category.
#[instrument(skip_all, fields(item_id = %id))]
pub async fn detail(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ItemId>,
) -> Result<DetailTemplate> {
    let item = load_item(&state, id).await?;
    let repo = ItemRepository::new(state.pool());
    let images = repo.images(id).await?;
    let related = repo.related(&item, RELATED_ITEMS).await?;
    let modifiable = page.user.as_ref().is_some_and(|u| can_modify(u, &item));

    Ok(DetailTemplate {
        page,
        item,
        images,
        related,
        can_modify: modifiable,
    })
}

// =============================================================================
// Create
// =============================================================================

async fn new_form(
    state: &AppState,
    page: PageContext,
    form: ItemFormInput,
    errors: FieldErrors,
) -> Result<ItemFormTemplate> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    let selected: Vec<CategoryId> = form
        .category
        .trim()
        .parse::<i64>()
        .map(CategoryId::new)
        .into_iter()
        .collect();

    Ok(ItemFormTemplate {
        page,
        title: "Add New Item",
        action: "/items/new".to_owned(),
        is_new: true,
        categories: CategoryOption::list(categories, &selected),
        form,
        errors,
        max_images: MAX_IMAGES,
    })
}

/// Display the empty create form.
pub async fn new_page(
    State(state): State<AppState>,
    RequireStaff(_user): RequireStaff,
    page: PageContext,
) -> Result<Response> {
    Ok(form_response(
        new_form(&state, page, ItemFormInput::default(), FieldErrors::new()).await?,
    ))
}

/// Read the multipart create form: text fields plus up to three `images` parts.
///
/// Empty file inputs (no file chosen) are skipped.
async fn read_item_multipart(mut multipart: Multipart) -> Result<(ItemFormInput, Vec<ImageUpload>)> {
    let mut input = ItemFormInput::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "images" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                uploads.push(ImageUpload {
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
            "category" => input.category = value,
            "name" => input.name = value,
            "description" => input.description = value,
            "price" => input.price = value,
            "stock" => input.stock = value,
            _ => {}
        }
    }

    Ok((input, uploads))
}

/// Handle the create form. Redirects to the new item on success.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    page: PageContext,
    multipart: Multipart,
) -> Result<Response> {
    let (input, uploads) = read_item_multipart(multipart).await?;
    let catalog = CatalogService::new(
        state.pool(),
        state.media(),
        state.config().max_upload_bytes,
    );

    match catalog.create(&input, &uploads, user.id).await {
        Ok(id) => Ok(Redirect::to(&format!("/items/{id}")).into_response()),
        Err(CatalogError::Invalid(errors)) => {
            Ok(form_response(new_form(&state, page, input, errors).await?))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Edit and Delete
// =============================================================================

/// Load an item the user may change: 404 if absent, 403 if not theirs.
async fn load_owned_item(state: &AppState, user: &CurrentUser, id: ItemId) -> Result<Item> {
    let item = load_item(state, id).await?;
    if can_modify(user, &item) {
        Ok(item)
    } else {
        tracing::info!(user_id = %user.id, item_id = %id, "item change refused");
        Err(AppError::Forbidden(format!("item {id}")))
    }
}

fn edit_form(page: PageContext, item: &Item, form: ItemFormInput, errors: FieldErrors) -> Response {
    form_response(ItemFormTemplate {
        page,
        title: "Edit Item",
        action: format!("/items/{}/edit", item.id),
        is_new: false,
        categories: Vec::new(),
        form,
        errors,
        max_images: MAX_IMAGES,
    })
}

/// Display the edit form pre-filled from the item.
#[instrument(skip_all, fields(item_id = %id))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    page: PageContext,
    Path(id): Path<ItemId>,
) -> Result<Response> {
    let item = load_owned_item(&state, &user, id).await?;
    let form = ItemFormInput::from_item(&item);
    Ok(edit_form(page, &item, form, FieldErrors::new()))
}

/// Handle the edit form. Redirects to the item on success.
#[instrument(skip_all, fields(item_id = %id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    page: PageContext,
    Path(id): Path<ItemId>,
    Form(input): Form<ItemFormInput>,
) -> Result<Response> {
    let item = load_owned_item(&state, &user, id).await?;
    let catalog = CatalogService::new(
        state.pool(),
        state.media(),
        state.config().max_upload_bytes,
    );

    match catalog.update(&item, &input).await {
        Ok(()) => Ok(Redirect::to(&format!("/items/{id}")).into_response()),
        Err(CatalogError::Invalid(errors)) => Ok(edit_form(page, &item, input, errors)),
        Err(e) => Err(e.into()),
    }
}

/// Ask for confirmation before deleting.
#[instrument(skip_all, fields(item_id = %id))]
pub async fn delete_page(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    page: PageContext,
    Path(id): Path<ItemId>,
) -> Result<DeleteTemplate> {
    let item = load_owned_item(&state, &user, id).await?;
    Ok(DeleteTemplate { page, item })
}

/// Delete the item and its images. Admins return to the catalog,
/// inventory managers to their dashboard.
#[instrument(skip_all, fields(item_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
    Path(id): Path<ItemId>,
) -> Result<Redirect> {
    let item = load_owned_item(&state, &user, id).await?;
    CatalogService::new(
        state.pool(),
        state.media(),
        state.config().max_upload_bytes,
    )
    .delete(&item)
    .await?;

    Ok(Redirect::to(user.role.after_delete_path()))
}

// =============================================================================
// Export
// =============================================================================

/// Download every item as CSV.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn export_csv(
    State(state): State<AppState>,
    RequireStaff(user): RequireStaff,
) -> Result<Response> {
    let items = ItemRepository::new(state.pool()).list_all().await?;
    let body = export::items_csv(&items);
    tracing::info!(user_id = %user.id, rows = items.len(), "inventory exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::FILE_NAME),
            ),
        ],
        body,
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_browse_params_repeated_categories() {
        let params = BrowseParams::parse(Some("query=red+lamp&category=2&category=3&category=x&page=2"));
        assert_eq!(params.query, "red lamp");
        assert_eq!(params.categories, vec![CategoryId::new(2), CategoryId::new(3)]);
        assert_eq!(params.page.as_deref(), Some("2"));
    }

    #[test]
    fn test_browse_params_empty() {
        assert_eq!(BrowseParams::parse(None), BrowseParams::default());
        assert_eq!(BrowseParams::parse(Some("")), BrowseParams::default());
    }

    #[test]
    fn test_filter_query_round_trip() {
        let params = BrowseParams::parse(Some("query=a%26b&category=3"));
        assert_eq!(params.filter_query(), "query=a%26b&category=3");
        assert_eq!(BrowseParams::default().filter_query(), "");
    }

    #[test]
    fn test_browse_fragment_json_keys() {
        let fragment = BrowseFragment {
            html_content: "<p>none</p>".to_owned(),
            num_pages: 2,
        };
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json, serde_json::json!({"html_content": "<p>none</p>", "numPages": 2}));
    }

    #[test]
    fn test_is_ajax() {
        let mut headers = HeaderMap::new();
        assert!(!is_ajax(&headers));
        headers.insert(AJAX_HEADER, HeaderValue::from_static("XMLHttpRequest"));
        assert!(is_ajax(&headers));
    }
}
