//! Crate-level error type.
//!
//! Each layer has its own `thiserror` enum; [`RetailerError`] wraps them for
//! callers (like the CLI) that drive several layers and only need one
//! message to show.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::session::StoreError;

/// Any error the retailer client can surface.
#[derive(Debug, Error)]
pub enum RetailerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The action needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    /// The signed-in user's role cannot perform the action.
    #[error("role {0} cannot check out")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl RetailerError {
    /// Message to show the retailer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Store(e) => e.to_string(),
            Self::Api(e) => e.user_message(),
            Self::Cart(e) => e.user_message(),
            Self::Checkout(e) => e.user_message(),
            Self::NotSignedIn => "Please login again".to_string(),
            Self::Forbidden(role) => format!("Only retailers can check out (signed in as {role})"),
            Self::NotFound(what) => format!("{what} not found"),
        }
    }
}

/// Result type alias using `RetailerError`.
pub type Result<T> = std::result::Result<T, RetailerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_delegates_to_layer() {
        let err = RetailerError::from(CartError::InvalidQuantity(0));
        assert_eq!(err.user_message(), "Enter valid quantity to add to cart");

        let err = RetailerError::from(CheckoutError::EmptyCart);
        assert_eq!(err.user_message(), "Cart is empty");
        assert_eq!(err.to_string(), "cart is empty");

        assert_eq!(RetailerError::NotSignedIn.user_message(), "Please login again");
    }

    #[test]
    fn test_not_found_message() {
        let err = RetailerError::NotFound("Product 12".to_string());
        assert_eq!(err.user_message(), "Product 12 not found");
    }
}
