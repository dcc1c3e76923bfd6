//! AgriTrade retailer client library.
//!
//! Cart, checkout and delivery tracking for the retailer role of the
//! AgriTrade marketplace, talking to the marketplace REST backend.
//!
//! # Modules
//!
//! - [`cart`] - Persisted cart with client-side stock checks
//! - [`checkout`] - Order placement and payment collection state machines
//! - [`api`] - REST client and wire types
//! - [`session`] - Tab-scoped and durable key-value stores, signed-in identity
//! - [`tracking`] - Live delivery-agent position polling
//! - [`state`] - Wiring for a retailer session
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing and Sentry set-up

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use error::{Result, RetailerError};
pub use state::RetailerState;
