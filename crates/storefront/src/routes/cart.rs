//! Cart route handlers.
//!
//! Every mutation redirects back to the cart page; edge cases such as
//! increasing past the stock snapshot are silently ignored.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, CartLine, ItemId};

use crate::error::Result;
use crate::routes::PageContext;
use crate::services::CartService;
use crate::state::AppState;

/// Cart page path.
pub const CART_PATH: &str = "/cart";

/// Cart line display data for templates.
pub struct CartLineView {
    pub item_id: ItemId,
    pub name: String,
    pub image: Option<String>,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    pub can_increase: bool,
    pub can_decrease: bool,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            item_id: line.item_id(),
            name: line.name().to_owned(),
            image: line.image().map(str::to_owned),
            unit_price: line.unit_price().to_string(),
            quantity: line.quantity(),
            line_total: line.line_total().to_string(),
            can_increase: !line.at_stock_limit(),
            can_decrease: line.quantity() > 1,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLineView>,
    pub sub_total: String,
    pub tax: String,
    pub total: String,
}

impl CartTemplate {
    fn new(page: PageContext, cart: &Cart) -> Self {
        let totals = cart.totals();
        Self {
            page,
            lines: cart.lines().map(CartLineView::from).collect(),
            sub_total: totals.sub_total.to_string(),
            tax: totals.tax.to_string(),
            total: totals.total.to_string(),
        }
    }
}

/// Display the cart with its totals.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<CartTemplate> {
    let cart = CartService::new(state.pool(), &session).cart().await?;
    Ok(CartTemplate::new(page, &cart))
}

/// Add one unit of an item. 404 if the item does not exist.
#[instrument(skip_all, fields(item_id = %item_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<ItemId>,
) -> Result<Redirect> {
    CartService::new(state.pool(), &session).add(item_id).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Remove an item's line.
#[instrument(skip_all, fields(item_id = %item_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<ItemId>,
) -> Result<Redirect> {
    CartService::new(state.pool(), &session).remove(item_id).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Increment an item's quantity.
#[instrument(skip_all, fields(item_id = %item_id))]
pub async fn increase(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<ItemId>,
) -> Result<Redirect> {
    CartService::new(state.pool(), &session).increase(item_id).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Decrement an item's quantity.
#[instrument(skip_all, fields(item_id = %item_id))]
pub async fn decrease(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<ItemId>,
) -> Result<Redirect> {
    CartService::new(state.pool(), &session).decrease(item_id).await?;
    Ok(Redirect::to(CART_PATH))
}
