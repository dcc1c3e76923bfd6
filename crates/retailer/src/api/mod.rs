//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - [`MarketplaceApi`] is the seam the checkout flow and delivery tracker
//!   depend on; tests substitute in-memory fakes
//! - [`MarketplaceClient`] implements it over HTTP with `reqwest`
//! - The catalog listing is cached in memory via `moka`; everything else goes
//!   straight to the backend, which is the source of truth for stock
//!
//! # Example
//!
//! ```rust,ignore
//! use agritrade_retailer::api::{MarketplaceApi, MarketplaceClient};
//!
//! let client = MarketplaceClient::new(&config.api)?;
//! let products = client.list_products().await?;
//! ```

mod client;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use agritrade_core::DeliveryAgentId;
use thiserror::Error;

pub use client::MarketplaceClient;
pub use types::*;

/// Errors that can occur when talking to the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// A single human-readable description suitable for showing to a user.
    ///
    /// Server-supplied messages win; transport failures get a generic
    /// description.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() => "Request timed out".to_string(),
            Self::Http(e) if e.is_connect() => "Could not reach the marketplace".to_string(),
            Self::Http(e) => format!("Network error: {e}"),
            Self::Parse(_) => "Unexpected response from the marketplace".to_string(),
        }
    }
}

/// Pick the most useful message out of an error response body.
///
/// Precedence: a `message` field, a plain string body (JSON string or raw
/// text), an `error` field, then a generic status description.
#[must_use]
pub fn extract_error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => {
            let field = |name: &str| {
                map.get(name)
                    .and_then(serde_json::Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            };
            if let Some(message) = field("message") {
                return message;
            }
            if let Some(error) = field("error") {
                return error;
            }
        }
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => return s,
        Ok(_) => {}
        Err(_) if !trimmed.is_empty() => {
            return trimmed.chars().take(200).collect();
        }
        Err(_) => {}
    }

    format!("Request failed (Status: {status})")
}

/// Operations the retailer flows need from the backend.
///
/// Futures are `Send` so implementations can be driven from spawned tasks.
pub trait MarketplaceApi {
    /// List catalog products.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Place one order for a single product.
    fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> impl Future<Output = Result<CreatedOrder, ApiError>> + Send;

    /// Fetch the payment gateway's public key.
    fn payment_key(&self) -> impl Future<Output = Result<GatewayKey, ApiError>> + Send;

    /// Ask the backend to open a gateway payment for an amount.
    fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> impl Future<Output = Result<PaymentIntent, ApiError>> + Send;

    /// Have the backend check a gateway signature.
    ///
    /// A negative verdict is `Ok` with `success == false`.
    fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> impl Future<Output = Result<VerificationResult, ApiError>> + Send;

    /// Latest reported position of a delivery agent.
    fn agent_location(
        &self,
        agent: DeliveryAgentId,
    ) -> impl Future<Output = Result<AgentLocation, ApiError>> + Send;

    /// Drop any cached catalog data.
    fn invalidate_catalog(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

impl<T: MarketplaceApi + Send + Sync> MarketplaceApi for Arc<T> {
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send {
        (**self).list_products()
    }

    fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> impl Future<Output = Result<CreatedOrder, ApiError>> + Send {
        (**self).create_order(request)
    }

    fn payment_key(&self) -> impl Future<Output = Result<GatewayKey, ApiError>> + Send {
        (**self).payment_key()
    }

    fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> impl Future<Output = Result<PaymentIntent, ApiError>> + Send {
        (**self).create_payment_intent(request)
    }

    fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> impl Future<Output = Result<VerificationResult, ApiError>> + Send {
        (**self).verify_payment(request)
    }

    fn agent_location(
        &self,
        agent: DeliveryAgentId,
    ) -> impl Future<Output = Result<AgentLocation, ApiError>> + Send {
        (**self).agent_location(agent)
    }

    fn invalidate_catalog(&self) -> impl Future<Output = ()> + Send {
        (**self).invalidate_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_field_wins() {
        let body = r#"{"message":"Insufficient stock","error":"Bad Request"}"#;
        assert_eq!(extract_error_message(400, body), "Insufficient stock");
    }

    #[test]
    fn test_error_field_used_without_message() {
        let body = r#"{"error":"Order not found"}"#;
        assert_eq!(extract_error_message(400, body), "Order not found");
    }

    #[test]
    fn test_plain_string_bodies() {
        assert_eq!(extract_error_message(500, "\"Product not found\""), "Product not found");
        assert_eq!(extract_error_message(500, "Retailer not found"), "Retailer not found");
    }

    #[test]
    fn test_generic_fallback() {
        assert_eq!(extract_error_message(502, ""), "Request failed (Status: 502)");
        assert_eq!(extract_error_message(500, "{}"), "Request failed (Status: 500)");
        assert_eq!(
            extract_error_message(500, r#"{"message":"  "}"#),
            "Request failed (Status: 500)"
        );
    }

    #[test]
    fn test_status_error_user_message() {
        let err = ApiError::Status {
            status: 400,
            message: "Insufficient stock".to_string(),
        };
        assert_eq!(err.user_message(), "Insufficient stock");
        assert_eq!(err.to_string(), "API error: 400 - Insufficient stock");
    }
}
