//! Role enums shared by the marketplace clients.

use serde::{Deserialize, Serialize};

/// Marketplace role attached to a signed-in user.
///
/// Serialized the way the backend issues it (`"DELIVERY_AGENT"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Lists produce and confirms stock.
    Farmer,
    /// Buys produce; the only role with a cart.
    Retailer,
    /// Manages users, products and support.
    Admin,
    /// Picks up and delivers orders.
    DeliveryAgent,
}

impl UserRole {
    /// Whether this role may build a cart and check out.
    #[must_use]
    pub const fn can_checkout(self) -> bool {
        matches!(self, Self::Retailer)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Farmer => write!(f, "FARMER"),
            Self::Retailer => write!(f, "RETAILER"),
            Self::Admin => write!(f, "ADMIN"),
            Self::DeliveryAgent => write!(f, "DELIVERY_AGENT"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FARMER" => Ok(Self::Farmer),
            "RETAILER" => Ok(Self::Retailer),
            "ADMIN" => Ok(Self::Admin),
            "DELIVERY_AGENT" => Ok(Self::DeliveryAgent),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}
