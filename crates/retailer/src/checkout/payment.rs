//! Payment collection for one checkout attempt.
//!
//! A [`PaymentSession`] walks
//! `idle → awaitingGatewayConfig → gatewayReady → widgetOpen → verifying`
//! and ends in exactly one of `succeeded`, `failed` or `cancelled`. Each widget
//! callback has its own entry point; calling one from the wrong state is an
//! [`PaymentError::InvalidTransition`] and leaves the session untouched.
//!
//! Sessions are single use. Retrying a payment means building a new one.

use std::fmt;
use std::time::Duration;

use agritrade_core::{CurrencyCode, OrderId, Price, join_order_ids};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::widget::{
    GatewayFailure, MERCHANT_NAME, PaymentConfirmation, PaymentWidget, WidgetEvent, WidgetRequest,
};
use crate::api::{CreatePaymentIntentRequest, MarketplaceApi, VerifyPaymentRequest};
use crate::config::CheckoutSettings;
use crate::telemetry;

const CONFIGURATION_FAILED: &str = "Failed to load payment configuration";
const CANCELLED_BY_USER: &str = "Payment cancelled by user";
const VERIFICATION_FAILED: &str = "Payment verification failed";
const VERIFICATION_TIMED_OUT: &str = "Payment verification timed out";

/// Lifecycle of a [`PaymentSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentState {
    Idle,
    AwaitingGatewayConfig,
    GatewayReady,
    WidgetOpen,
    Verifying,
    Succeeded,
    Failed,
    Cancelled,
}

impl PaymentState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingGatewayConfig => "awaitingGatewayConfig",
            Self::GatewayReady => "gatewayReady",
            Self::WidgetOpen => "widgetOpen",
            Self::Verifying => "verifying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failed payment went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Gateway key could not be fetched; no widget was shown.
    Configuration,
    /// The backend refused to open a gateway payment.
    Intent,
    /// The gateway reported a failure through the widget.
    Gateway,
    /// The signature check failed, errored or timed out.
    Verification,
}

/// Terminal result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded { payment_id: String },
    Failed { stage: FailureStage, reason: String },
    Cancelled { reason: String },
}

/// Errors raised by session entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("cannot {event} while payment is {state}")]
    InvalidTransition {
        state: PaymentState,
        event: &'static str,
    },
}

/// One payment attempt for a set of placed orders.
#[derive(Debug)]
pub struct PaymentSession {
    order_ids: Vec<OrderId>,
    amount: Decimal,
    currency: CurrencyCode,
    verify_timeout: Option<Duration>,
    state: PaymentState,
    key: Option<String>,
    confirmation: Option<PaymentConfirmation>,
    outcome: Option<PaymentOutcome>,
}

impl PaymentSession {
    /// A fresh session for `amount` covering `order_ids`.
    #[must_use]
    pub const fn new(order_ids: Vec<OrderId>, amount: Decimal, settings: &CheckoutSettings) -> Self {
        Self {
            order_ids,
            amount,
            currency: settings.currency,
            verify_timeout: settings.verify_timeout,
            state: PaymentState::Idle,
            key: None,
            confirmation: None,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> PaymentState {
        self.state
    }

    /// Comma-joined order ids, as the payment endpoints expect them.
    #[must_use]
    pub fn order_ref(&self) -> String {
        join_order_ids(&self.order_ids)
    }

    fn expect_state(&self, expected: PaymentState, event: &'static str) -> Result<(), PaymentError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PaymentError::InvalidTransition {
                state: self.state,
                event,
            })
        }
    }

    fn transition(&mut self, next: PaymentState) {
        debug!(from = %self.state, to = %next, "Payment state change");
        telemetry::add_breadcrumb("payment", next.as_str(), &[("orders", self.order_ref().as_str())]);
        self.state = next;
    }

    fn finish(&mut self, outcome: PaymentOutcome) -> PaymentState {
        let next = match &outcome {
            PaymentOutcome::Succeeded { payment_id } => {
                info!(payment_id = %payment_id, "Payment verified");
                PaymentState::Succeeded
            }
            PaymentOutcome::Failed { stage, reason } => {
                warn!(stage = ?stage, reason = %reason, "Payment failed");
                PaymentState::Failed
            }
            PaymentOutcome::Cancelled { reason } => {
                info!(reason = %reason, "Payment cancelled");
                PaymentState::Cancelled
            }
        };
        self.transition(next);
        self.outcome = Some(outcome);
        next
    }

    fn fail(&mut self, stage: FailureStage, reason: impl Into<String>) -> PaymentState {
        self.finish(PaymentOutcome::Failed {
            stage,
            reason: reason.into(),
        })
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Fetch the gateway key. Failure ends the session before any widget.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the session is idle.
    pub async fn load_gateway_config<A: MarketplaceApi + Sync>(
        &mut self,
        api: &A,
    ) -> Result<PaymentState, PaymentError> {
        self.expect_state(PaymentState::Idle, "load gateway configuration")?;
        self.transition(PaymentState::AwaitingGatewayConfig);

        match api.payment_key().await {
            Ok(key) if !key.key.trim().is_empty() => {
                self.key = Some(key.key);
                self.transition(PaymentState::GatewayReady);
                Ok(self.state)
            }
            Ok(_) => Ok(self.fail(FailureStage::Configuration, CONFIGURATION_FAILED)),
            Err(e) => {
                warn!(error = %e, "Failed to fetch gateway key");
                Ok(self.fail(FailureStage::Configuration, CONFIGURATION_FAILED))
            }
        }
    }

    /// Create the gateway payment and describe the widget to show.
    ///
    /// Returns `None` if the session failed instead.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the gateway is ready.
    pub async fn open_widget<A: MarketplaceApi + Sync>(
        &mut self,
        api: &A,
    ) -> Result<Option<WidgetRequest>, PaymentError> {
        self.expect_state(PaymentState::GatewayReady, "open the payment widget")?;

        let amount = match Price::new(self.amount, self.currency).to_minor_units() {
            Ok(amount) if amount > 0 => amount,
            Ok(_) | Err(_) => {
                self.fail(FailureStage::Intent, format!("Invalid payment amount: {}", self.amount));
                return Ok(None);
            }
        };

        let request = CreatePaymentIntentRequest {
            order_ref: self.order_ref(),
            amount,
            currency: self.currency,
        };

        match api.create_payment_intent(&request).await {
            Ok(intent) => {
                let widget = WidgetRequest {
                    key: self.key.clone().unwrap_or_default(),
                    gateway_order_id: intent.id,
                    amount_minor: intent.amount,
                    currency: self.currency,
                    merchant: MERCHANT_NAME.to_string(),
                    description: "Order Payment".to_string(),
                };
                self.transition(PaymentState::WidgetOpen);
                Ok(Some(widget))
            }
            Err(e) => {
                self.fail(FailureStage::Intent, e.user_message());
                Ok(None)
            }
        }
    }

    /// The widget reported a signed payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the widget is open.
    pub fn on_payment_authorized(
        &mut self,
        confirmation: PaymentConfirmation,
    ) -> Result<PaymentState, PaymentError> {
        self.expect_state(PaymentState::WidgetOpen, "accept an authorization")?;
        self.confirmation = Some(confirmation);
        self.transition(PaymentState::Verifying);
        Ok(self.state)
    }

    /// The customer closed the widget.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the widget is open.
    pub fn on_dismissed(&mut self) -> Result<PaymentState, PaymentError> {
        self.expect_state(PaymentState::WidgetOpen, "dismiss the widget")?;
        Ok(self.finish(PaymentOutcome::Cancelled {
            reason: CANCELLED_BY_USER.to_string(),
        }))
    }

    /// The gateway reported a failure.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the widget is open.
    pub fn on_gateway_failure(
        &mut self,
        failure: &GatewayFailure,
    ) -> Result<PaymentState, PaymentError> {
        self.expect_state(PaymentState::WidgetOpen, "report a gateway failure")?;
        Ok(self.fail(FailureStage::Gateway, failure.message()))
    }

    /// Route a widget event to its entry point.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless the widget is open.
    pub fn handle(&mut self, event: WidgetEvent) -> Result<PaymentState, PaymentError> {
        match event {
            WidgetEvent::Authorized(confirmation) => self.on_payment_authorized(confirmation),
            WidgetEvent::Dismissed => self.on_dismissed(),
            WidgetEvent::Failed(failure) => self.on_gateway_failure(&failure),
        }
    }

    /// Ask the backend to check the signature.
    ///
    /// Only an explicit `success: true` counts. Errors, timeouts and negative
    /// verdicts all fail the session.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidTransition` unless verification is pending.
    pub async fn verify<A: MarketplaceApi + Sync>(
        &mut self,
        api: &A,
    ) -> Result<PaymentState, PaymentError> {
        self.expect_state(PaymentState::Verifying, "verify")?;
        let Some(confirmation) = self.confirmation.clone() else {
            return Ok(self.fail(FailureStage::Verification, VERIFICATION_FAILED));
        };

        let request = VerifyPaymentRequest {
            gateway_order_id: confirmation.gateway_order_id,
            payment_id: confirmation.payment_id.clone(),
            signature: confirmation.signature,
            order_ref: self.order_ref(),
        };

        let call = api.verify_payment(&request);
        let result = match self.verify_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.ok(),
            None => Some(call.await),
        };

        let state = match result {
            None => self.fail(FailureStage::Verification, VERIFICATION_TIMED_OUT),
            Some(Ok(verdict)) if verdict.success => self.finish(PaymentOutcome::Succeeded {
                payment_id: confirmation.payment_id,
            }),
            Some(Ok(verdict)) => {
                debug!(message = ?verdict.message, "Backend rejected payment signature");
                self.fail(FailureStage::Verification, VERIFICATION_FAILED)
            }
            Some(Err(e)) => self.fail(
                FailureStage::Verification,
                format!("Payment verification error: {}", e.user_message()),
            ),
        };
        Ok(state)
    }

    /// Give up on a session that has not finished.
    ///
    /// Returns whether the session was still live.
    pub fn abandon(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.finish(PaymentOutcome::Cancelled {
            reason: "Payment abandoned".to_string(),
        });
        true
    }

    /// Drive the whole lifecycle with `widget` and report the outcome.
    pub async fn run<A, W>(mut self, api: &A, widget: &mut W) -> PaymentOutcome
    where
        A: MarketplaceApi + Sync,
        W: PaymentWidget + Send,
    {
        if let Err(e) = self.drive(api, widget).await {
            warn!(error = %e, "Payment session stalled");
            self.abandon();
        }

        self.outcome.unwrap_or_else(|| PaymentOutcome::Failed {
            stage: FailureStage::Verification,
            reason: VERIFICATION_FAILED.to_string(),
        })
    }

    async fn drive<A, W>(&mut self, api: &A, widget: &mut W) -> Result<(), PaymentError>
    where
        A: MarketplaceApi + Sync,
        W: PaymentWidget + Send,
    {
        if self.load_gateway_config(api).await?.is_terminal() {
            return Ok(());
        }

        let Some(request) = self.open_widget(api).await? else {
            return Ok(());
        };

        let event = widget.open(&request).await;
        if self.handle(event)? == PaymentState::Verifying {
            self.verify(api).await?;
        }
        Ok(())
    }
}
