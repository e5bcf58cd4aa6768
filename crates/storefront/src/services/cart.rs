//! The session cart controller.
//!
//! Each operation reads the cart from the session, applies one mutation and
//! writes it back when something changed. Requests that mutate the same
//! session are serialized by `middleware::session_lock`, so the
//! read-modify-write here cannot lose updates.

use sqlx::SqlitePool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, CartUpdate, ItemId};

use crate::db::{ItemRepository, RepositoryError};
use crate::models::session_keys;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The item to add does not exist.
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// Reading or writing the session failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Catalog lookup failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Load the cart from the session, empty if none is stored.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn load_cart(session: &Session) -> Result<Cart, tower_sessions::session::Error> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Cart operations bound to one session.
pub struct CartService<'a> {
    session: &'a Session,
    items: ItemRepository<'a>,
}

impl<'a> CartService<'a> {
    /// Create a cart service for `session`.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool, session: &'a Session) -> Self {
        Self {
            session,
            items: ItemRepository::new(pool),
        }
    }

    /// Current cart contents.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session cannot be read.
    pub async fn cart(&self) -> Result<Cart, CartError> {
        Ok(load_cart(self.session).await?)
    }

    /// Add one unit of an item, snapshotting its name, price, primary image
    /// and stock on first add.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the item does not exist.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn add(&self, item_id: ItemId) -> Result<CartUpdate, CartError> {
        let item = self
            .items
            .get(item_id)
            .await?
            .ok_or(CartError::ItemNotFound(item_id))?;
        let images = self.items.images(item_id).await?;
        let snapshot = item.to_cart_item(images.first());

        self.apply(|cart| cart.add(snapshot)).await
    }

    /// Remove an item's line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session cannot be read or written.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove(&self, item_id: ItemId) -> Result<CartUpdate, CartError> {
        self.apply(|cart| cart.remove(item_id)).await
    }

    /// Increment an item's quantity up to its stock snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session cannot be read or written.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn increase(&self, item_id: ItemId) -> Result<CartUpdate, CartError> {
        self.apply(|cart| cart.increase(item_id)).await
    }

    /// Decrement an item's quantity, never below one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session cannot be read or written.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn decrease(&self, item_id: ItemId) -> Result<CartUpdate, CartError> {
        self.apply(|cart| cart.decrease(item_id)).await
    }

    async fn apply<F>(&self, op: F) -> Result<CartUpdate, CartError>
    where
        F: FnOnce(&mut Cart) -> CartUpdate,
    {
        let mut cart = load_cart(self.session).await?;
        let update = op(&mut cart);

        if update.changed() {
            self.session.insert(session_keys::CART, &cart).await?;
            tracing::info!(?update, lines = cart.len(), "cart updated");
        } else {
            tracing::debug!("cart unchanged");
        }

        Ok(update)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bazaar_core::{CategoryId, Email, Money, Role};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::db::{CategoryRepository, UserRepository, test_pool};
    use crate::models::NewItem;

    async fn seed_item(pool: &SqlitePool, price_cents: i64, stock: u32) -> ItemId {
        let email = Email::parse("m@example.com").unwrap();
        let owner = UserRepository::new(pool)
            .create("m", &email, "h", Role::InventoryManager)
            .await
            .unwrap()
            .id;
        let category: CategoryId = CategoryRepository::new(pool).create("General").await.unwrap().id;
        let new = NewItem {
            category_id: category,
            name: "Widget".to_owned(),
            description: None,
            price: Money::from_cents(price_cents),
            stock,
            created_by: owner,
        };
        ItemRepository::new(pool)
            .create(&new, &["item_images/w.jpg".to_owned()])
            .await
            .unwrap()
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_add_snapshots_item() {
        let pool = test_pool().await;
        let id = seed_item(&pool, 1000, 3).await;
        let session = session();
        let carts = CartService::new(&pool, &session);

        assert_eq!(carts.add(id).await.unwrap(), CartUpdate::Added);
        assert_eq!(carts.add(id).await.unwrap(), CartUpdate::Incremented);

        let cart = carts.cart().await.unwrap();
        let line = cart.get(id).unwrap();
        assert_eq!(line.name(), "Widget");
        assert_eq!(line.image(), Some("item_images/w.jpg"));
        assert_eq!(line.quantity(), 2);
        assert_eq!(line.line_total(), Money::from_cents(2000));
    }

    #[tokio::test]
    async fn test_add_missing_item() {
        let pool = test_pool().await;
        let session = session();
        let carts = CartService::new(&pool, &session);

        assert!(matches!(
            carts.add(ItemId::new(404)).await,
            Err(CartError::ItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_sold_out_item_is_noop() {
        let pool = test_pool().await;
        let id = seed_item(&pool, 500, 0).await;
        let session = session();
        let carts = CartService::new(&pool, &session);

        assert_eq!(carts.add(id).await.unwrap(), CartUpdate::Unchanged);
        assert!(carts.cart().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mutators_round_trip_through_session() {
        let pool = test_pool().await;
        let id = seed_item(&pool, 250, 2).await;
        let session = session();
        let carts = CartService::new(&pool, &session);

        carts.add(id).await.unwrap();
        assert_eq!(carts.increase(id).await.unwrap(), CartUpdate::Incremented);
        assert_eq!(carts.increase(id).await.unwrap(), CartUpdate::Unchanged);
        assert_eq!(carts.decrease(id).await.unwrap(), CartUpdate::Decremented);
        assert_eq!(carts.decrease(id).await.unwrap(), CartUpdate::Unchanged);
        assert_eq!(carts.remove(id).await.unwrap(), CartUpdate::Removed);
        assert_eq!(carts.remove(id).await.unwrap(), CartUpdate::Unchanged);
        assert!(carts.cart().await.unwrap().is_empty());
    }
}
