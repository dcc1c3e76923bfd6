//! Wire types for the marketplace REST API.
//!
//! Field names follow the backend's JSON (camelCase, plus the gateway's
//! `razorpay_*` names on the verification call).

use agritrade_core::{CurrencyCode, OrderId, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Label shown when a product carries no farmer.
pub const UNKNOWN_FARMER: &str = "N/A";

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product as listed by `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in the currency's standard unit.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Advertised stock. The backend calls this `quantity`.
    #[serde(alias = "quantity", default)]
    pub stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer: Option<FarmerSummary>,
}

impl Product {
    /// Provenance label for display.
    #[must_use]
    pub fn farmer_label(&self) -> String {
        self.farmer
            .as_ref()
            .and_then(|f| f.name.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_FARMER)
            .to_string()
    }
}

/// The farmer embedded in a product listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmerSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// Body of `POST /orders/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: ProductId,
    pub retailer_id: UserId,
    pub quantity: u32,
}

/// Response of `POST /orders/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    #[serde(alias = "id")]
    pub order_id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
}

// =============================================================================
// Payments
// =============================================================================

/// Response of `GET /payments/key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayKey {
    /// Public key the hosted widget is opened with.
    pub key: String,
}

/// Body of `POST /payments/create-order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Comma-joined order ids this payment covers.
    #[serde(rename = "orderId")]
    pub order_ref: String,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: CurrencyCode,
}

/// Response of `POST /payments/create-order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway-side order id the widget must be opened with.
    #[serde(alias = "gatewayOrderId")]
    pub id: String,
    /// Amount in minor units as echoed by the gateway.
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Body of `POST /payments/verify-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(rename = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(rename = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(rename = "razorpay_signature")]
    pub signature: String,
    #[serde(rename = "orderId")]
    pub order_ref: String,
}

/// Response of `POST /payments/verify-payment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Delivery tracking
// =============================================================================

/// Response of `GET /delivery-agents/{id}/location`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentLocation {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl AgentLocation {
    /// The reported point, unless it is missing or the `(0, 0)` placeholder
    /// the backend returns before an agent has reported in.
    #[must_use]
    pub fn position(self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 && lat.is_finite() && lng.is_finite() => {
                Some(GeoPoint { lat, lng })
            }
            _ => None,
        }
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_accepts_backend_shape() {
        let json = r#"{
            "id": 5,
            "name": "Tomatoes",
            "price": 24.5,
            "quantity": 120,
            "imageUrl": null,
            "category": "Vegetables",
            "farmer": {"id": 2, "name": "Meena", "email": "m@example.com"}
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(5));
        assert_eq!(product.price, Decimal::new(245, 1));
        assert_eq!(product.stock, 120);
        assert_eq!(product.farmer_label(), "Meena");
    }

    #[test]
    fn test_product_integer_price_and_missing_farmer() {
        let product: Product =
            serde_json::from_str(r#"{"id":1,"name":"Rice","price":40,"stock":3}"#).unwrap();
        assert_eq!(product.price, Decimal::new(40, 0));
        assert_eq!(product.farmer_label(), UNKNOWN_FARMER);
    }

    #[test]
    fn test_created_order_accepts_id_alias() {
        let a: CreatedOrder = serde_json::from_str(r#"{"orderId":9,"totalAmount":30.0}"#).unwrap();
        let b: CreatedOrder = serde_json::from_str(r#"{"id":9}"#).unwrap();
        assert_eq!(a.order_id, b.order_id);
    }

    #[test]
    fn test_verify_request_uses_gateway_field_names() {
        let body = VerifyPaymentRequest {
            gateway_order_id: "order_X".to_string(),
            payment_id: "pay_Y".to_string(),
            signature: "sig".to_string(),
            order_ref: "1,2".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["razorpay_order_id"], "order_X");
        assert_eq!(value["razorpay_payment_id"], "pay_Y");
        assert_eq!(value["razorpay_signature"], "sig");
        assert_eq!(value["orderId"], "1,2");
    }

    #[test]
    fn test_intent_request_wire_format() {
        let body = CreatePaymentIntentRequest {
            order_ref: "4".to_string(),
            amount: 4000,
            currency: CurrencyCode::INR,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value, serde_json::json!({"orderId": "4", "amount": 4000, "currency": "INR"}));
    }

    #[test]
    fn test_placeholder_location_is_ignored() {
        let zero = AgentLocation { latitude: Some(0.0), longitude: Some(0.0) };
        let missing = AgentLocation { latitude: None, longitude: Some(77.5) };
        let real = AgentLocation { latitude: Some(12.97), longitude: Some(77.59) };
        assert_eq!(zero.position(), None);
        assert_eq!(missing.position(), None);
        assert_eq!(real.position(), Some(GeoPoint { lat: 12.97, lng: 77.59 }));
    }
}
