//! Per-request data every page layout needs, and pagination links.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bazaar_core::PageWindow;

use crate::models::{CurrentUser, session_keys};
use crate::services::cart::load_cart;

/// Navigation bar data: who is logged in and how many units are in the cart.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
}

impl PageContext {
    /// Logged-in username, if any.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    /// Whether the navigation shows staff links.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_staff())
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let cart_count = match load_cart(session).await {
            Ok(cart) => cart.item_count(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cart for navigation");
                0
            }
        };

        Ok(Self { user, cart_count })
    }
}

/// One numbered link in a pagination bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Pagination bar data for templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<PageLink>,
    pub next: Option<PageLink>,
    pub links: Vec<PageLink>,
}

impl Pagination {
    /// Build links for `window`. `base` is the URL up to and including
    /// `?` or `&`, so that `page=N` can be appended.
    #[must_use]
    pub fn new(window: &PageWindow, base: &str) -> Self {
        let link = |number: u32| PageLink {
            number,
            href: format!("{base}page={number}"),
            current: number == window.number,
        };

        Self {
            number: window.number,
            num_pages: window.num_pages,
            previous: window.has_previous().then(|| link(window.number - 1)),
            next: window.has_next().then(|| link(window.number + 1)),
            links: window.numbers().map(link).collect(),
        }
    }
}
