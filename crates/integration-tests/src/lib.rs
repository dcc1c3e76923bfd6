//! Integration test harness for the AgriTrade retailer client.
//!
//! [`MockMarketplace`] is an in-process `axum` stand-in for the marketplace
//! backend, bound to an ephemeral port. It serves the catalog, order,
//! payment and delivery-tracking endpoints with the backend's JSON shapes and
//! records every request so tests can assert on what the client sent.
//!
//! ```rust,ignore
//! let market = MockMarketplace::start(MockSettings::with_products(vec![
//!     MockProduct::new(1, "Basmati Rice", 40.0, 10),
//! ]))
//! .await;
//! let client = market.client();
//! ```

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use agritrade_retailer::api::MarketplaceClient;
use agritrade_retailer::checkout::{
    PaymentConfirmation, PaymentWidget, WidgetEvent, WidgetRequest,
};
use agritrade_retailer::config::ApiConfig;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use url::Url;

/// Bearer token the harness hands to clients.
pub const TEST_TOKEN: &str = "test-bearer-0f3c9a";

// =============================================================================
// Configuration
// =============================================================================

/// A catalog entry as the backend stores it.
#[derive(Debug, Clone)]
pub struct MockProduct {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub farmer: Option<String>,
}

impl MockProduct {
    pub fn new(id: i64, name: &str, price: f64, quantity: i64) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            quantity,
            farmer: Some("Meena Devi".to_string()),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "price": self.price,
            "quantity": self.quantity,
            "category": "Grains",
            "imageUrl": null,
            "farmer": self.farmer.as_ref().map(|name| json!({ "id": 900 + self.id, "name": name })),
        })
    }
}

/// How the mock behaves.
#[derive(Debug, Clone, Default)]
pub struct MockSettings {
    pub products: Vec<MockProduct>,
    /// 1-based order creation call that fails with `Insufficient stock`.
    pub fail_order_at: Option<usize>,
    /// Make `GET /payments/key` fail.
    pub key_fails: bool,
    /// Make verification answer `400 { success: false }`.
    pub reject_signature: bool,
    /// Reported agent positions, by agent id.
    pub locations: HashMap<i64, (f64, f64)>,
}

impl MockSettings {
    #[must_use]
    pub fn with_products(products: Vec<MockProduct>) -> Self {
        Self {
            products,
            ..Self::default()
        }
    }
}

// =============================================================================
// Recorded traffic
// =============================================================================

#[derive(Debug, Default)]
struct Recorded {
    products: Vec<MockProduct>,
    catalog_fetches: usize,
    order_calls: usize,
    orders: Vec<Value>,
    intents: Vec<Value>,
    verifications: Vec<Value>,
    auth_headers: Vec<Option<String>>,
}

struct MockState {
    settings: MockSettings,
    recorded: Mutex<Recorded>,
}

impl MockState {
    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn note_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.recorded().auth_headers.push(auth);
    }
}

type Shared = Arc<MockState>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, body: Value) -> Reply {
    Err((status, Json(body)))
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_products(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    state.note_auth(&headers);
    let mut recorded = state.recorded();
    recorded.catalog_fetches += 1;
    Json(Value::Array(
        recorded.products.iter().map(MockProduct::to_json).collect(),
    ))
}

async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.note_auth(&headers);
    let mut recorded = state.recorded();
    recorded.order_calls += 1;

    if state.settings.fail_order_at == Some(recorded.order_calls) {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({ "message": "Insufficient stock" }),
        );
    }

    let product_id = body["productId"].as_i64().unwrap_or_default();
    let quantity = body["quantity"].as_i64().unwrap_or_default();
    if body["retailerId"].as_i64().is_none() || quantity <= 0 {
        return reject(StatusCode::BAD_REQUEST, json!("Invalid order request"));
    }

    let Some(product) = recorded.products.iter_mut().find(|p| p.id == product_id) else {
        return reject(
            StatusCode::NOT_FOUND,
            json!({ "error": "Product not found" }),
        );
    };
    if quantity > product.quantity {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({ "message": format!("Insufficient stock for {}", product.name) }),
        );
    }
    product.quantity -= quantity;
    let total = product.price * f64::from(u32::try_from(quantity).unwrap_or(u32::MAX));
    let name = product.name.clone();

    recorded.orders.push(body);
    let order_id = i64::try_from(recorded.orders.len()).unwrap_or(i64::MAX);
    Ok(Json(json!({
        "orderId": order_id,
        "productName": name,
        "totalAmount": total,
        "status": "PENDING",
    })))
}

async fn payment_key(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    state.note_auth(&headers);
    if state.settings.key_fails {
        return reject(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Razorpay keys not configured" }),
        );
    }
    Ok(Json(json!({ "key": "rzp_test_mock" })))
}

async fn create_payment_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.note_auth(&headers);
    let amount = body["amount"].as_i64().unwrap_or_default();
    if amount <= 0 {
        return reject(StatusCode::BAD_REQUEST, json!({ "message": "Invalid amount" }));
    }

    let mut recorded = state.recorded();
    recorded.intents.push(body);
    let id = format!("order_mock_{}", recorded.intents.len());
    Ok(Json(json!({ "id": id, "amount": amount, "currency": "INR", "status": "created" })))
}

async fn verify_payment(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.note_auth(&headers);
    state.recorded().verifications.push(body);
    if state.settings.reject_signature {
        return reject(
            StatusCode::BAD_REQUEST,
            json!({ "success": false, "message": "Invalid payment signature" }),
        );
    }
    Ok(Json(json!({ "success": true, "message": "Payment verified successfully" })))
}

async fn agent_location(State(state): State<Shared>, Path(agent): Path<i64>) -> Reply {
    match state.settings.locations.get(&agent) {
        Some((lat, lng)) => Ok(Json(json!({ "latitude": lat, "longitude": lng }))),
        None => reject(StatusCode::NOT_FOUND, json!("Delivery agent not found")),
    }
}

// =============================================================================
// MockMarketplace
// =============================================================================

/// A running mock backend.
pub struct MockMarketplace {
    addr: SocketAddr,
    state: Shared,
    server: tokio::task::JoinHandle<()>,
}

impl MockMarketplace {
    /// Bind to an ephemeral port and start serving.
    pub async fn start(settings: MockSettings) -> Self {
        let state = Arc::new(MockState {
            recorded: Mutex::new(Recorded {
                products: settings.products.clone(),
                ..Recorded::default()
            }),
            settings,
        });

        let api = Router::new()
            .route("/products", get(list_products))
            .route("/orders/create", post(create_order))
            .route("/payments/key", get(payment_key))
            .route("/payments/create-order", post(create_payment_order))
            .route("/payments/verify-payment", post(verify_payment))
            .route("/delivery-agents/{id}/location", get(agent_location))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock marketplace");
        let addr = listener.local_addr().expect("mock marketplace address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve mock marketplace");
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/api", self.addr)).expect("mock base url")
    }

    /// API settings pointing at this mock, with [`TEST_TOKEN`].
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(self.base_url());
        config.token = Some(TEST_TOKEN.to_string().into());
        config
    }

    /// A client for this mock.
    #[must_use]
    pub fn client(&self) -> MarketplaceClient {
        MarketplaceClient::new(&self.api_config()).expect("build marketplace client")
    }

    /// Orders the backend accepted, as sent.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.state.recorded().orders.clone()
    }

    /// Order creation calls, accepted or not.
    #[must_use]
    pub fn order_calls(&self) -> usize {
        self.state.recorded().order_calls
    }

    #[must_use]
    pub fn intents(&self) -> Vec<Value> {
        self.state.recorded().intents.clone()
    }

    #[must_use]
    pub fn verifications(&self) -> Vec<Value> {
        self.state.recorded().verifications.clone()
    }

    #[must_use]
    pub fn catalog_fetches(&self) -> usize {
        self.state.recorded().catalog_fetches
    }

    /// `Authorization` header of every authenticated endpoint call.
    #[must_use]
    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.recorded().auth_headers.clone()
    }

    /// Current server-side stock of a product.
    #[must_use]
    pub fn stock_of(&self, product_id: i64) -> Option<i64> {
        self.state
            .recorded()
            .products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.quantity)
    }
}

impl Drop for MockMarketplace {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Widget double
// =============================================================================

/// Widget that answers every open with a fixed event.
#[derive(Debug)]
pub struct ScriptedWidget {
    event: WidgetEvent,
    opened: Vec<WidgetRequest>,
}

impl ScriptedWidget {
    #[must_use]
    pub const fn new(event: WidgetEvent) -> Self {
        Self {
            event,
            opened: Vec::new(),
        }
    }

    /// A widget whose customer pays successfully.
    #[must_use]
    pub fn paying() -> Self {
        Self::new(WidgetEvent::Authorized(PaymentConfirmation {
            gateway_order_id: "order_mock_1".to_string(),
            payment_id: "pay_mock_1".to_string(),
            signature: "mock_signature".to_string(),
        }))
    }

    #[must_use]
    pub fn opened(&self) -> &[WidgetRequest] {
        &self.opened
    }
}

impl PaymentWidget for ScriptedWidget {
    async fn open(&mut self, request: &WidgetRequest) -> WidgetEvent {
        self.opened.push(request.clone());
        self.event.clone()
    }
}
