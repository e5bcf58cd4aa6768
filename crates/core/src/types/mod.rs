//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod pagination;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use pagination::{PageWindow, Paginator};
pub use role::{Role, RoleError};
