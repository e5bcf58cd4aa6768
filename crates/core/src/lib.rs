//! Bazaar Core - Shared domain types and cart logic.
//!
//! This crate provides the types used across all Bazaar components:
//! - `storefront` - The web application (catalog, accounts, cart)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. The shopping cart lives here because it is a value object:
//! the web layer loads it from the session, calls one of its operations and
//! writes it back.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, money, roles and pagination
//! - [`cart`] - The session cart and its totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartItem, CartLine, CartTotals, CartUpdate, TAX_RATE_PERCENT, compute_totals};
pub use types::*;
