//! The session shopping cart.
//!
//! A [`Cart`] is a value object: the web layer loads it from the session,
//! applies one operation and stores it back. Lines are snapshots of the item
//! at the time it was first added and do not follow later catalog edits.
//!
//! Invariants held by every line:
//! - `1 <= quantity <= stock` (the stock snapshot taken on add)
//! - `line_total == unit_price * quantity` (derived, never stored)
//! - at most one line per item id

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, Money};

/// Sales tax applied on top of the cart sub-total.
pub const TAX_RATE_PERCENT: u32 = 13;

/// Catalog data copied into a new cart line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// Item being added.
    pub item_id: ItemId,
    /// Display name.
    pub name: String,
    /// Primary image path, if the item has images.
    pub image: Option<String>,
    /// Current price.
    pub unit_price: Money,
    /// Current stock; caps the line quantity.
    pub stock: u32,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    item_id: ItemId,
    name: String,
    image: Option<String>,
    unit_price: Money,
    quantity: u32,
    stock: u32,
}

impl CartLine {
    fn new(item: CartItem) -> Self {
        Self {
            item_id: item.item_id,
            name: item.name,
            image: item.image,
            unit_price: item.unit_price,
            quantity: 1,
            stock: item.stock,
        }
    }

    /// Item id.
    #[must_use]
    pub const fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// Item name at add time.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary image path at add time.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Unit price at add time.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Quantity, always at least one.
    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Stock at add time.
    #[must_use]
    pub const fn stock(&self) -> u32 {
        self.stock
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Whether the quantity has reached the stock snapshot.
    #[must_use]
    pub const fn at_stock_limit(&self) -> bool {
        self.quantity >= self.stock
    }
}

/// What a cart operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartUpdate {
    /// A new line was inserted with quantity one.
    Added,
    /// An existing line's quantity went up by one.
    Incremented,
    /// An existing line's quantity went down by one.
    Decremented,
    /// A line was deleted.
    Removed,
    /// Nothing changed (missing line, stock limit, floor of one, or no stock).
    Unchanged,
}

impl CartUpdate {
    /// Whether the cart was modified.
    #[must_use]
    pub const fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    /// Sum of all line totals.
    pub sub_total: Money,
    /// `sub_total * 13%`.
    pub tax: Money,
    /// `sub_total + tax`.
    pub total: Money,
}

/// The shopping cart, keyed by item id.
///
/// Serialized as a list of lines. Deserializing collapses duplicate ids,
/// drops lines without stock and clamps quantities into `1..=stock`, so a
/// tampered or stale session value still upholds the line invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: BTreeMap<ItemId, CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `item`.
    ///
    /// An item already in the cart is incremented up to its stock snapshot;
    /// a new item is inserted with quantity one unless it has no stock.
    pub fn add(&mut self, item: CartItem) -> CartUpdate {
        if let Some(line) = self.lines.get_mut(&item.item_id) {
            return Self::bump(line);
        }
        if item.stock == 0 {
            return CartUpdate::Unchanged;
        }
        self.lines.insert(item.item_id, CartLine::new(item));
        CartUpdate::Added
    }

    /// Delete the line for `item_id`.
    pub fn remove(&mut self, item_id: ItemId) -> CartUpdate {
        match self.lines.remove(&item_id) {
            Some(_) => CartUpdate::Removed,
            None => CartUpdate::Unchanged,
        }
    }

    /// Increment the line for `item_id`, stopping at its stock snapshot.
    pub fn increase(&mut self, item_id: ItemId) -> CartUpdate {
        self.lines
            .get_mut(&item_id)
            .map_or(CartUpdate::Unchanged, Self::bump)
    }

    /// Decrement the line for `item_id`, never below one.
    pub fn decrease(&mut self, item_id: ItemId) -> CartUpdate {
        match self.lines.get_mut(&item_id) {
            Some(line) if line.quantity > 1 => {
                line.quantity -= 1;
                CartUpdate::Decremented
            }
            _ => CartUpdate::Unchanged,
        }
    }

    fn bump(line: &mut CartLine) -> CartUpdate {
        if line.at_stock_limit() {
            CartUpdate::Unchanged
        } else {
            line.quantity += 1;
            CartUpdate::Incremented
        }
    }

    /// The line for `item_id`, if any.
    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<&CartLine> {
        self.lines.get(&item_id)
    }

    /// Lines in item id order.
    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    /// Number of distinct items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.values().map(CartLine::quantity).sum()
    }

    /// Sub-total, tax and total for this cart.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        compute_totals(self)
    }
}

/// Compute the sub-total, tax and grand total of `cart`.
#[must_use]
pub fn compute_totals(cart: &Cart) -> CartTotals {
    let sub_total: Money = cart.lines().map(CartLine::line_total).sum();
    let tax = sub_total.percent(TAX_RATE_PERCENT);
    CartTotals {
        sub_total,
        tax,
        total: sub_total + tax,
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut cart = Self::new();
        for mut line in lines {
            if line.stock == 0 || cart.lines.contains_key(&line.item_id) {
                continue;
            }
            line.quantity = line.quantity.clamp(1, line.stock);
            cart.lines.insert(line.item_id, line);
        }
        cart
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines.into_values().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: i64, price_cents: i64, stock: u32) -> CartItem {
        CartItem {
            item_id: ItemId::new(id),
            name: format!("Item {id}"),
            image: Some(format!("item_images/{id}.jpg")),
            unit_price: Money::from_cents(price_cents),
            stock,
        }
    }

    fn qty(cart: &Cart, id: i64) -> Option<u32> {
        cart.get(ItemId::new(id)).map(CartLine::quantity)
    }

    #[test]
    fn test_add_increase_sequence() {
        let mut cart = Cart::new();
        let id = ItemId::new(5);

        assert_eq!(cart.add(item(5, 1000, 3)), CartUpdate::Added);
        assert_eq!(qty(&cart, 5), Some(1));
        assert_eq!(cart.get(id).unwrap().line_total(), Money::from_cents(1000));

        assert_eq!(cart.add(item(5, 1000, 3)), CartUpdate::Incremented);
        assert_eq!(qty(&cart, 5), Some(2));
        assert_eq!(cart.get(id).unwrap().line_total(), Money::from_cents(2000));

        assert_eq!(cart.increase(id), CartUpdate::Incremented);
        assert_eq!(qty(&cart, 5), Some(3));
        assert_eq!(cart.get(id).unwrap().line_total(), Money::from_cents(3000));

        assert_eq!(cart.increase(id), CartUpdate::Unchanged);
        assert_eq!(qty(&cart, 5), Some(3));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_repeated_adds_cap_at_stock() {
        let mut cart = Cart::new();
        for _ in 0..10 {
            cart.add(item(1, 250, 4));
        }
        let line = cart.get(ItemId::new(1)).unwrap();
        assert_eq!(line.quantity(), 4);
        assert_eq!(line.line_total(), Money::from_cents(1000));
    }

    #[test]
    fn test_add_uses_snapshot_not_new_item_data() {
        let mut cart = Cart::new();
        cart.add(item(1, 500, 1));
        // Stock went up in the catalog; the line still caps at the snapshot.
        assert_eq!(cart.add(item(1, 900, 10)), CartUpdate::Unchanged);
        let line = cart.get(ItemId::new(1)).unwrap();
        assert_eq!(line.quantity(), 1);
        assert_eq!(line.unit_price(), Money::from_cents(500));
    }

    #[test]
    fn test_add_out_of_stock_is_noop() {
        let mut cart = Cart::new();
        assert_eq!(cart.add(item(1, 500, 0)), CartUpdate::Unchanged);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_then_add_starts_fresh() {
        let mut cart = Cart::new();
        cart.add(item(2, 100, 5));
        cart.add(item(2, 100, 5));
        assert_eq!(cart.remove(ItemId::new(2)), CartUpdate::Removed);
        assert!(cart.is_empty());
        cart.add(item(2, 100, 5));
        assert_eq!(qty(&cart, 2), Some(1));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = Cart::new();
        assert_eq!(cart.remove(ItemId::new(9)), CartUpdate::Unchanged);
    }

    #[test]
    fn test_decrease_floors_at_one() {
        let mut cart = Cart::new();
        cart.add(item(3, 100, 5));
        cart.add(item(3, 100, 5));
        assert_eq!(cart.decrease(ItemId::new(3)), CartUpdate::Decremented);
        assert_eq!(cart.decrease(ItemId::new(3)), CartUpdate::Unchanged);
        assert_eq!(qty(&cart, 3), Some(1));
    }

    #[test]
    fn test_increase_and_decrease_missing_are_noops() {
        let mut cart = Cart::new();
        assert_eq!(cart.increase(ItemId::new(1)), CartUpdate::Unchanged);
        assert_eq!(cart.decrease(ItemId::new(1)), CartUpdate::Unchanged);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_totals() {
        let mut cart = Cart::new();
        cart.add(item(1, 1000, 5));
        cart.add(item(1, 1000, 5));
        cart.add(item(2, 999, 5));

        let totals = cart.totals();
        assert_eq!(totals.sub_total, Money::from_cents(2999));
        assert_eq!(totals.tax.amount(), Decimal::new(389_87, 4));
        assert_eq!(totals.total.amount(), Decimal::new(3388_87, 4));
        assert_eq!(totals.tax.to_string(), "$3.90");
        assert_eq!(totals.total.to_string(), "$33.89");
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_totals_of_empty_cart() {
        assert_eq!(compute_totals(&Cart::new()), CartTotals::default());
    }

    #[test]
    fn test_lines_in_id_order() {
        let mut cart = Cart::new();
        cart.add(item(7, 100, 1));
        cart.add(item(2, 100, 1));
        cart.add(item(4, 100, 1));
        let ids: Vec<i64> = cart.lines().map(|l| l.item_id().as_i64()).collect();
        assert_eq!(ids, vec![2, 4, 7]);
    }

    #[test]
    fn test_deserialize_repairs_invalid_lines() {
        let json = r#"[
            {"item_id":1,"name":"A","image":null,"unit_price":"2.00","quantity":9,"stock":3},
            {"item_id":1,"name":"dup","image":null,"unit_price":"5.00","quantity":1,"stock":3},
            {"item_id":2,"name":"B","image":null,"unit_price":"1.00","quantity":0,"stock":2},
            {"item_id":3,"name":"C","image":null,"unit_price":"1.00","quantity":1,"stock":0}
        ]"#;
        let cart: Cart = serde_json::from_str(json).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(qty(&cart, 1), Some(3));
        assert_eq!(cart.get(ItemId::new(1)).unwrap().name(), "A");
        assert_eq!(qty(&cart, 2), Some(1));
        assert_eq!(qty(&cart, 3), None);
    }

    #[test]
    fn test_serde_preserves_lines() {
        let mut cart = Cart::new();
        cart.add(item(1, 1234, 2));
        cart.add(item(1, 1234, 2));
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(json[0]["quantity"], 2);
        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back, cart);
    }
}
