//! Checkout: turning a cart into placed, paid orders.
//!
//! # Architecture
//!
//! - [`CheckoutOrchestrator`] places one backend order per cart line, in
//!   order, stopping at the first failure
//! - [`PaymentSession`] collects a single payment for everything placed
//! - [`PaymentWidget`] is the host's payment UI
//!
//! The cart is cleared only after the backend has verified the payment. Any
//! other ending leaves it untouched for a retry.

mod orchestrator;
mod payment;
mod widget;

use agritrade_core::OrderId;
use thiserror::Error;

pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt, CheckoutState, PlacedOrders};
pub use payment::{FailureStage, PaymentError, PaymentOutcome, PaymentSession, PaymentState};
pub use widget::{
    GatewayFailure, MERCHANT_NAME, PaymentConfirmation, PaymentWidget, WidgetEvent, WidgetRequest,
};

/// Ways a checkout attempt can end without completing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("checkout cannot start while {0}")]
    InvalidState(CheckoutState),

    /// The backend refused an order part-way through. Orders already placed
    /// are not rolled back.
    #[error("order creation failed after {placed} of {total} orders: {message}")]
    OrderCreation {
        placed: usize,
        total: usize,
        placed_ids: Vec<OrderId>,
        message: String,
    },

    #[error("payment configuration failed: {0}")]
    PaymentConfiguration(String),

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("payment cancelled: {0}")]
    PaymentCancelled(String),
}

impl CheckoutError {
    /// Message to show the retailer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Cart is empty".to_string(),
            Self::InvalidState(state) if state.is_busy() => {
                "A checkout is already in progress".to_string()
            }
            Self::InvalidState(_) => "No orders are awaiting payment".to_string(),
            Self::OrderCreation {
                placed,
                total,
                message,
                ..
            } => format!("{message} ({placed} of {total} orders were placed)"),
            Self::PaymentConfiguration(reason)
            | Self::PaymentFailed(reason)
            | Self::PaymentCancelled(reason) => reason.clone(),
        }
    }

    /// Whether the retailer chose to stop, as opposed to something failing.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::PaymentCancelled(_))
    }
}
