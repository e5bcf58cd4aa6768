//! Catalog domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{CartItem, CategoryId, ItemId, ItemImageId, Money, UserId};

/// An item category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Display name, unique.
    pub name: String,
}

/// An uploaded item image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemImage {
    /// Image row ID.
    pub id: ItemImageId,
    /// Owning item.
    pub item_id: ItemId,
    /// Path relative to the media directory.
    pub path: String,
    /// Display order; position 0 is the primary image.
    pub position: u8,
}

/// A catalog item with its category and creator names resolved.
#[derive(Debug, Clone)]
pub struct Item {
    /// Item ID.
    pub id: ItemId,
    /// Category ID.
    pub category_id: CategoryId,
    /// Category name.
    pub category_name: String,
    /// Item name.
    pub name: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Unit price.
    pub price: Money,
    /// Units in stock.
    pub stock: u32,
    /// Creator's user ID.
    pub created_by: UserId,
    /// Creator's username.
    pub created_by_username: String,
    /// When the item was listed.
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// An item is sold once its stock reaches zero.
    #[must_use]
    pub const fn is_sold(&self) -> bool {
        self.stock == 0
    }

    /// Snapshot of this item for the cart.
    #[must_use]
    pub fn to_cart_item(&self, primary_image: Option<&ItemImage>) -> CartItem {
        CartItem {
            item_id: self.id,
            name: self.name.clone(),
            image: primary_image.map(|img| img.path.clone()),
            unit_price: self.price,
            stock: self.stock,
        }
    }
}

/// An item as shown on listing cards.
#[derive(Debug, Clone)]
pub struct ItemSummary {
    /// Item ID.
    pub id: ItemId,
    /// Item name.
    pub name: String,
    /// Unit price.
    pub price: Money,
    /// Units in stock.
    pub stock: u32,
    /// Primary image path, if any.
    pub image: Option<String>,
}

/// Fields for inserting an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub category_id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub created_by: UserId,
}

/// Editable fields of an existing item.
#[derive(Debug, Clone)]
pub struct UpdateItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: u32,
}
