//! The hosted payment widget seam.
//!
//! The gateway's checkout UI is opaque: it is opened with a public key and a
//! gateway order id, and eventually reports exactly one of authorized,
//! dismissed or failed. Hosts implement [`PaymentWidget`] to bridge whatever
//! UI they have (a browser, a terminal prompt, a test double).

use std::future::Future;

use agritrade_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Merchant name shown in the widget.
pub const MERCHANT_NAME: &str = "AgriTrade";

/// Everything a widget needs to collect one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetRequest {
    /// Gateway public key.
    pub key: String,
    /// Gateway-side order id from the payment intent.
    pub gateway_order_id: String,
    /// Amount in minor units, as echoed by the gateway.
    pub amount_minor: i64,
    pub currency: CurrencyCode,
    pub merchant: String,
    pub description: String,
}

impl WidgetRequest {
    /// The amount in standard units, for display.
    #[must_use]
    pub fn display_amount(&self) -> Price {
        Price::new(Decimal::new(self.amount_minor, 2), self.currency)
    }
}

/// The signed confirmation a widget hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Failure details reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFailure {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl GatewayFailure {
    /// Description, else `Payment failed (<code>)`, else `Payment failed`.
    #[must_use]
    pub fn message(&self) -> String {
        let present = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(description) = present(&self.description) {
            description
        } else if let Some(code) = present(&self.code) {
            format!("Payment failed ({code})")
        } else {
            "Payment failed".to_string()
        }
    }
}

/// The single event a widget reports after being opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Authorized(PaymentConfirmation),
    Dismissed,
    Failed(GatewayFailure),
}

/// A host-provided payment UI.
pub trait PaymentWidget {
    /// Show the widget and wait for the customer to finish with it.
    fn open(&mut self, request: &WidgetRequest) -> impl Future<Output = WidgetEvent> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_precedence() {
        let full = GatewayFailure {
            code: Some("BAD_REQUEST_ERROR".to_string()),
            description: Some("Card declined".to_string()),
        };
        assert_eq!(full.message(), "Card declined");

        let code_only = GatewayFailure {
            code: Some("GATEWAY_ERROR".to_string()),
            description: Some("  ".to_string()),
        };
        assert_eq!(code_only.message(), "Payment failed (GATEWAY_ERROR)");

        assert_eq!(GatewayFailure::default().message(), "Payment failed");
    }

    #[test]
    fn test_display_amount() {
        let request = WidgetRequest {
            key: "rzp_test".to_string(),
            gateway_order_id: "order_1".to_string(),
            amount_minor: 4050,
            currency: CurrencyCode::INR,
            merchant: MERCHANT_NAME.to_string(),
            description: "Order Payment".to_string(),
        };
        assert_eq!(request.display_amount().to_string(), "₹ 40.50");
    }
}
