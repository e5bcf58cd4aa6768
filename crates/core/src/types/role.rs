//! Account roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown [`Role`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleError(pub String);

/// The role an account holds.
///
/// Exactly one role per account. Stored as `customer`, `inventory_manager`
/// or `admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Shops and manages their own profile.
    #[default]
    Customer,
    /// Lists items and manages the ones they created.
    InventoryManager,
    /// Manages any item.
    Admin,
}

impl Role {
    /// Roles a visitor may pick when signing up.
    pub const SELF_SERVICE: [Self; 2] = [Self::Customer, Self::InventoryManager];

    /// Storage / form value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::InventoryManager => "inventory_manager",
            Self::Admin => "admin",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::InventoryManager => "Inventory Manager",
            Self::Admin => "Admin",
        }
    }

    /// Whether this role may create items, see the dashboard and export CSV.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        matches!(self, Self::InventoryManager | Self::Admin)
    }

    /// Whether this role may edit or delete items created by someone else.
    #[must_use]
    pub const fn can_manage_any_item(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Where to send the user after they delete an item.
    #[must_use]
    pub const fn after_delete_path(&self) -> &'static str {
        match self {
            Self::Admin => "/items",
            Self::InventoryManager => "/dashboard",
            Self::Customer => "/",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "customer" => Ok(Self::Customer),
            "inventory_manager" => Ok(Self::InventoryManager),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!(
            "inventory-manager".parse::<Role>().unwrap(),
            Role::InventoryManager
        );
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        for role in [Role::Customer, Role::InventoryManager, Role::Admin] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }

    #[test]
    fn test_permissions() {
        assert!(!Role::Customer.is_staff());
        assert!(Role::InventoryManager.is_staff());
        assert!(Role::Admin.is_staff());
        assert!(!Role::InventoryManager.can_manage_any_item());
        assert!(Role::Admin.can_manage_any_item());
    }

    #[test]
    fn test_after_delete_path() {
        assert_eq!(Role::Admin.after_delete_path(), "/items");
        assert_eq!(Role::InventoryManager.after_delete_path(), "/dashboard");
    }

    #[test]
    fn test_self_service_excludes_admin() {
        assert!(!Role::SELF_SERVICE.contains(&Role::Admin));
    }
}
