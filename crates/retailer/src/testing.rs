//! In-memory doubles shared by unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use agritrade_core::{DeliveryAgentId, OrderId, ProductId};
use rust_decimal::Decimal;

use crate::api::{
    AgentLocation, ApiError, CreateOrderRequest, CreatePaymentIntentRequest, CreatedOrder,
    GatewayKey, MarketplaceApi, PaymentIntent, Product, VerificationResult, VerifyPaymentRequest,
};
use crate::checkout::{PaymentConfirmation, PaymentWidget, WidgetEvent, WidgetRequest};

/// How the fake answers verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Accept,
    Reject,
    Error,
    Hang,
}

/// Scriptable [`MarketplaceApi`] that records every request.
#[derive(Debug, Default)]
pub struct FakeApi {
    pub products: Vec<Product>,
    /// 1-based order request that fails with "Insufficient stock".
    pub fail_order_at: Option<usize>,
    pub key_fails: bool,
    pub verdict: Verdict,
    pub locations: Mutex<VecDeque<Result<AgentLocation, u16>>>,
    pub orders: Mutex<Vec<CreateOrderRequest>>,
    pub intents: Mutex<Vec<CreatePaymentIntentRequest>>,
    pub verifications: Mutex<Vec<VerifyPaymentRequest>>,
    pub invalidations: AtomicUsize,
    pub location_polls: AtomicUsize,
}

impl FakeApi {
    pub fn orders(&self) -> Vec<CreateOrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    pub fn intents(&self) -> Vec<CreatePaymentIntentRequest> {
        self.intents.lock().unwrap().clone()
    }

    pub fn verifications(&self) -> Vec<VerifyPaymentRequest> {
        self.verifications.lock().unwrap().clone()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn location_polls(&self) -> usize {
        self.location_polls.load(Ordering::SeqCst)
    }

    pub fn push_location(&self, location: Result<AgentLocation, u16>) {
        self.locations.lock().unwrap().push_back(location);
    }
}

fn status(status: u16, message: &str) -> ApiError {
    ApiError::Status {
        status,
        message: message.to_string(),
    }
}

impl MarketplaceApi for FakeApi {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        Ok(self.products.clone())
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder, ApiError> {
        let mut orders = self.orders.lock().unwrap();
        orders.push(request.clone());
        let n = orders.len();
        if self.fail_order_at == Some(n) {
            return Err(status(400, "Insufficient stock"));
        }
        Ok(CreatedOrder {
            order_id: OrderId::new(100 + i64::try_from(n).unwrap()),
            product_name: None,
        })
    }

    async fn payment_key(&self) -> Result<GatewayKey, ApiError> {
        if self.key_fails {
            return Err(status(500, "Payment gateway not configured"));
        }
        Ok(GatewayKey {
            key: "rzp_test_key".to_string(),
        })
    }

    async fn create_payment_intent(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, ApiError> {
        self.intents.lock().unwrap().push(request.clone());
        Ok(PaymentIntent {
            id: "order_gw_1".to_string(),
            amount: request.amount,
            currency: Some(request.currency.to_string()),
        })
    }

    async fn verify_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerificationResult, ApiError> {
        self.verifications.lock().unwrap().push(request.clone());
        match self.verdict {
            Verdict::Accept => Ok(VerificationResult {
                success: true,
                message: Some("Payment verified successfully".to_string()),
            }),
            Verdict::Reject => Ok(VerificationResult {
                success: false,
                message: Some("Invalid signature".to_string()),
            }),
            Verdict::Error => Err(status(500, "Verification service unavailable")),
            Verdict::Hang => std::future::pending().await,
        }
    }

    async fn agent_location(&self, _agent: DeliveryAgentId) -> Result<AgentLocation, ApiError> {
        self.location_polls.fetch_add(1, Ordering::SeqCst);
        let next = self.locations.lock().unwrap().pop_front();
        match next {
            Some(Ok(location)) => Ok(location),
            Some(Err(code)) => Err(status(code, "Delivery agent not found")),
            None => Ok(AgentLocation {
                latitude: None,
                longitude: None,
            }),
        }
    }

    async fn invalidate_catalog(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Widget that reports a fixed event and records what it was opened with.
#[derive(Debug)]
pub struct ScriptedWidget {
    event: WidgetEvent,
    opened: Vec<WidgetRequest>,
}

impl ScriptedWidget {
    pub const fn new(event: WidgetEvent) -> Self {
        Self {
            event,
            opened: Vec::new(),
        }
    }

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

pub fn confirmation() -> PaymentConfirmation {
    PaymentConfirmation {
        gateway_order_id: "order_gw_1".to_string(),
        payment_id: "pay_test".to_string(),
        signature: "sig_test".to_string(),
    }
}

pub fn authorized() -> WidgetEvent {
    WidgetEvent::Authorized(confirmation())
}

pub fn product(id: i64, price: i64, stock: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::new(price, 0),
        stock,
        category: None,
        farmer: None,
    }
}
