//! Sequential order placement followed by a single payment.

use std::fmt;

use agritrade_core::{OrderId, Price, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::CheckoutError;
use super::payment::{FailureStage, PaymentOutcome, PaymentSession};
use super::widget::PaymentWidget;
use crate::api::{CreateOrderRequest, MarketplaceApi};
use crate::cart::{CartLine, CartStore};
use crate::config::CheckoutSettings;
use crate::session::{CurrentUser, KeyValueStore};
use crate::telemetry;

/// Lifecycle of a [`CheckoutOrchestrator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckoutState {
    #[default]
    Idle,
    PlacingOrders,
    AwaitingPayment,
    Completed,
    Aborted,
}

impl CheckoutState {
    /// Whether an attempt is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::PlacingOrders | Self::AwaitingPayment)
    }
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::PlacingOrders => "placingOrders",
            Self::AwaitingPayment => "awaitingPayment",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        })
    }
}

/// Orders created for one attempt, awaiting payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrders {
    pub order_ids: Vec<OrderId>,
    /// Sum over the cart lines as they were when placed.
    pub total: Decimal,
}

/// Proof of a completed checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_ids: Vec<OrderId>,
    pub total: Price,
    pub payment_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Drives checkout attempts against the marketplace.
///
/// One orchestrator may run many attempts in sequence, but only one at a
/// time.
#[derive(Debug)]
pub struct CheckoutOrchestrator<A> {
    api: A,
    settings: CheckoutSettings,
    state: CheckoutState,
}

impl<A: MarketplaceApi + Sync> CheckoutOrchestrator<A> {
    #[must_use]
    pub const fn new(api: A, settings: CheckoutSettings) -> Self {
        Self {
            api,
            settings,
            state: CheckoutState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CheckoutState {
        self.state
    }

    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    fn transition(&mut self, next: CheckoutState) {
        info!(from = %self.state, to = %next, "Checkout state change");
        telemetry::add_breadcrumb("checkout", &next.to_string(), &[]);
        self.state = next;
    }

    fn abort(&mut self, error: CheckoutError) -> CheckoutError {
        self.transition(CheckoutState::Aborted);
        if !error.is_cancellation() {
            telemetry::capture_failure(&error, "Checkout aborted");
        }
        error
    }

    /// Give up on an in-flight attempt, for example after its future was
    /// dropped. Returns whether anything was abandoned.
    pub fn abandon(&mut self) -> bool {
        if !self.state.is_busy() {
            return false;
        }
        warn!(state = %self.state, "Checkout abandoned");
        self.transition(CheckoutState::Aborted);
        true
    }

    /// Create one backend order per line, in order.
    ///
    /// Stops at the first refusal without rolling back what was already
    /// placed.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if `lines` is empty
    /// - `CheckoutError::InvalidState` if an attempt is already in flight
    /// - `CheckoutError::OrderCreation` if the backend refuses a line
    pub async fn place_orders(
        &mut self,
        lines: &[CartLine],
        retailer: UserId,
    ) -> Result<PlacedOrders, CheckoutError> {
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if self.state.is_busy() {
            return Err(CheckoutError::InvalidState(self.state));
        }
        self.transition(CheckoutState::PlacingOrders);

        let mut order_ids = Vec::with_capacity(lines.len());
        for line in lines {
            let request = CreateOrderRequest {
                product_id: line.product_id,
                retailer_id: retailer,
                quantity: line.quantity,
            };

            match self.api.create_order(&request).await {
                Ok(created) => {
                    info!(
                        order_id = %created.order_id,
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        "Order placed"
                    );
                    order_ids.push(created.order_id);
                }
                Err(e) => {
                    if !order_ids.is_empty() {
                        self.api.invalidate_catalog().await;
                    }
                    let error = CheckoutError::OrderCreation {
                        placed: order_ids.len(),
                        total: lines.len(),
                        placed_ids: order_ids,
                        message: e.user_message(),
                    };
                    return Err(self.abort(error));
                }
            }
        }

        self.api.invalidate_catalog().await;
        let total = lines.iter().map(CartLine::subtotal).sum();
        self.transition(CheckoutState::AwaitingPayment);
        Ok(PlacedOrders { order_ids, total })
    }

    /// Collect payment for orders placed by [`Self::place_orders`].
    ///
    /// Returns the gateway payment id.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::InvalidState` unless orders are awaiting payment
    /// - `CheckoutError::PaymentConfiguration`, `PaymentFailed` or
    ///   `PaymentCancelled` per the payment outcome
    pub async fn collect_payment<W>(
        &mut self,
        placed: &PlacedOrders,
        widget: &mut W,
    ) -> Result<String, CheckoutError>
    where
        W: PaymentWidget + Send,
    {
        if self.state != CheckoutState::AwaitingPayment {
            return Err(CheckoutError::InvalidState(self.state));
        }

        let session = PaymentSession::new(placed.order_ids.clone(), placed.total, &self.settings);
        match session.run(&self.api, widget).await {
            PaymentOutcome::Succeeded { payment_id } => {
                self.transition(CheckoutState::Completed);
                Ok(payment_id)
            }
            PaymentOutcome::Failed {
                stage: FailureStage::Configuration,
                reason,
            } => Err(self.abort(CheckoutError::PaymentConfiguration(reason))),
            PaymentOutcome::Failed { reason, .. } => {
                Err(self.abort(CheckoutError::PaymentFailed(reason)))
            }
            PaymentOutcome::Cancelled { reason } => {
                Err(self.abort(CheckoutError::PaymentCancelled(reason)))
            }
        }
    }

    /// Place and pay for everything in `cart`.
    ///
    /// The cart is cleared only when the payment is verified. Dropping the
    /// returned future mid-flight leaves the orchestrator `Aborted`, with
    /// any orders already placed left in place.
    ///
    /// # Errors
    ///
    /// See [`Self::place_orders`] and [`Self::collect_payment`].
    #[instrument(skip_all, fields(attempt = %Uuid::new_v4(), lines = cart.count(), retailer = %retailer.id))]
    pub async fn checkout<S, W>(
        &mut self,
        cart: &mut CartStore<S>,
        retailer: &CurrentUser,
        widget: &mut W,
    ) -> Result<CheckoutReceipt, CheckoutError>
    where
        S: KeyValueStore,
        W: PaymentWidget + Send,
    {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if self.state.is_busy() {
            return Err(CheckoutError::InvalidState(self.state));
        }

        let mut attempt = AttemptGuard { orchestrator: self };
        let lines = cart.lines().to_vec();
        let placed = attempt.orchestrator.place_orders(&lines, retailer.id).await?;
        let payment_id = attempt.orchestrator.collect_payment(&placed, widget).await?;

        cart.clear();
        info!(payment_id = %payment_id, orders = placed.order_ids.len(), "Checkout completed");

        Ok(CheckoutReceipt {
            order_ids: placed.order_ids,
            total: Price::new(placed.total, attempt.orchestrator.settings.currency),
            payment_id,
            completed_at: Utc::now(),
        })
    }
}

/// Aborts the orchestrator if the attempt holding it ends while still busy.
struct AttemptGuard<'a, A: MarketplaceApi + Sync> {
    orchestrator: &'a mut CheckoutOrchestrator<A>,
}

impl<A: MarketplaceApi + Sync> Drop for AttemptGuard<'_, A> {
    fn drop(&mut self) {
        self.orchestrator.abandon();
    }
}
