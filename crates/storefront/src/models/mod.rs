//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types (which live next to their queries in `crate::db`).

pub mod item;
pub mod session;
pub mod user;

pub use item::{Category, Item, ItemImage, ItemSummary, NewItem, UpdateItem};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Profile, User};
