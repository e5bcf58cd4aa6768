//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `account` - Profile view and update
//! - `auth` - Account registration and password login
//! - `cart` - The session cart controller (add / remove / increase / decrease)
//! - `catalog` - Item form validation and create / edit / delete
//! - `export` - CSV export of the inventory
//! - `forms` - Field-level validation messages shared by the form handlers
//! - `media` - Storage of uploaded item images

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod export;
pub mod forms;
pub mod media;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use forms::FieldErrors;
pub use media::{MediaError, MediaStore};
