//! Client-side shopping cart.
//!
//! The cart is an ordered list of [`CartLine`]s keyed by product id. Every
//! mutation rewrites the whole list into the tab-scoped store under
//! [`keys::CART`](crate::session::keys::CART), and construction restores it
//! from there.
//!
//! Quantities are bounded by the stock snapshot taken when a product was
//! added. The bound is advisory; the backend decides at order time.

pub mod stock;

use std::fmt;
use std::str::FromStr;

use agritrade_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::Product;
use crate::session::{KeyValueStore, keys};

// =============================================================================
// Types
// =============================================================================

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    /// Name at add time.
    pub name: String,
    /// Unit price at add time. Not refreshed from the catalog.
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Catalog stock when the line was last added to.
    pub max_stock: u32,
    #[serde(default)]
    pub farmer_label: String,
}

impl CartLine {
    /// Snapshot `product` into a new line.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity,
            max_stock: stock_bound(product),
            farmer_label: product.farmer_label(),
        }
    }

    /// `quantity * unit_price`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

fn stock_bound(product: &Product) -> u32 {
    u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX)
}

/// What [`CartStore::add`] does when asked for more than is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AddPolicy {
    /// Refuse the add.
    #[default]
    Reject,
    /// Add as many as are available, refusing only when none are.
    Clamp,
}

impl fmt::Display for AddPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Clamp => write!(f, "clamp"),
        }
    }
}

impl FromStr for AddPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("unknown add policy '{other}' (expected reject or clamp)")),
        }
    }
}

/// Local validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },
}

impl CartError {
    /// Message to show the retailer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidQuantity(_) => "Enter valid quantity to add to cart".to_string(),
            Self::InsufficientStock { available, .. } if *available > 0 => {
                format!("Not enough stock available (only {available} left)")
            }
            Self::InsufficientStock { .. } => "Not enough stock available".to_string(),
        }
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// The cart plus the store it persists to.
#[derive(Debug)]
pub struct CartStore<S: KeyValueStore> {
    lines: Vec<CartLine>,
    store: S,
    policy: AddPolicy,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Load the cart persisted in `store`.
    ///
    /// Never fails: a missing or unreadable snapshot yields an empty cart.
    pub fn restore(store: S) -> Self {
        let lines = match store.get(keys::CART) {
            Some(raw) => match serde_json::from_str::<Vec<CartLine>>(&raw) {
                Ok(lines) => sanitize(lines),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable cart snapshot");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!(lines = lines.len(), "Cart restored");
        Self {
            lines,
            store,
            policy: AddPolicy::default(),
        }
    }

    /// Use `policy` for over-stock adds.
    #[must_use]
    pub const fn with_policy(mut self, policy: AddPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// - `CartError::InvalidQuantity` if `quantity <= 0`
    /// - `CartError::InsufficientStock` if the request exceeds what is
    ///   available (under [`AddPolicy::Reject`]) or nothing is available
    ///   (under [`AddPolicy::Clamp`])
    pub fn add(&mut self, product: &Product, quantity: i64) -> Result<u32, CartError> {
        if quantity <= 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let available = stock::available(product, &self.lines);
        let refused = match self.policy {
            AddPolicy::Reject => quantity > available,
            AddPolicy::Clamp => available <= 0,
        };
        if refused {
            return Err(CartError::InsufficientStock {
                requested: quantity,
                available: available.max(0),
            });
        }

        let accepted = u32::try_from(quantity.min(available))
            .map_err(|_| CartError::InvalidQuantity(quantity))?;
        let max_stock = stock_bound(product);

        let new_quantity = if let Some(line) = self.line_mut(product.id) {
            line.max_stock = max_stock;
            line.quantity = line.quantity.saturating_add(accepted).min(max_stock);
            line.quantity
        } else {
            self.lines.push(CartLine::from_product(product, accepted));
            accepted
        };

        debug!(product_id = %product.id, quantity = new_quantity, "Added to cart");
        self.persist();
        Ok(new_quantity)
    }

    /// Set a line's quantity, clamped into `[1, max_stock]`.
    ///
    /// Returns the stored quantity, or `None` for an unknown product.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> Option<u32> {
        let line = self.line_mut(product_id)?;
        let upper = line.max_stock.max(1);
        let clamped = u32::try_from(quantity.clamp(1, i64::from(upper))).unwrap_or(upper);
        line.quantity = clamped;

        debug!(product_id = %product_id, quantity = clamped, "Cart quantity updated");
        self.persist();
        Some(clamped)
    }

    /// Remove a line. Returns whether one was present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product_id != product_id);
        let removed = self.lines.len() != before;
        if removed {
            debug!(product_id = %product_id, "Removed from cart");
        }
        self.persist();
        removed
    }

    /// Empty the cart and overwrite the snapshot.
    pub fn clear(&mut self) {
        self.lines.clear();
        debug!("Cart cleared");
        self.persist();
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn units(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    /// Units of `product` still addable.
    #[must_use]
    pub fn available(&self, product: &Product) -> i64 {
        stock::available(product, &self.lines)
    }

    /// Whether an add of `product` should be offered at all.
    #[must_use]
    pub fn can_add(&self, product: &Product) -> bool {
        stock::can_add(product, &self.lines)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    /// Write the snapshot. Failures are logged; the in-memory cart stands.
    fn persist(&self) {
        let result = serde_json::to_string(&self.lines)
            .map_err(crate::session::StoreError::from)
            .and_then(|encoded| self.store.set(keys::CART, &encoded));

        if let Err(e) = result {
            warn!(error = %e, "Failed to persist cart snapshot");
        }
    }
}

/// Drop lines a well-behaved cart could never have produced.
fn sanitize(lines: Vec<CartLine>) -> Vec<CartLine> {
    let mut kept: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 || kept.iter().any(|k| k.product_id == line.product_id) {
            warn!(product_id = %line.product_id, "Dropping invalid cart line");
            continue;
        }
        kept.push(line);
    }
    kept
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::api::FarmerSummary;
    use crate::session::MemoryStore;

    fn product(id: i64, price: i64, stock: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(price, 0),
            stock,
            category: Some("Grains".to_string()),
            farmer: Some(FarmerSummary {
                id: None,
                name: Some("Meena".to_string()),
            }),
        }
    }

    fn cart() -> CartStore<Arc<MemoryStore>> {
        CartStore::restore(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_total_and_count_scenario() {
        let (a, b) = (product(1, 10, 10), product(2, 5, 10));
        let mut cart = cart();
        cart.add(&a, 3).unwrap();
        cart.add(&b, 2).unwrap();
        assert_eq!(cart.total(), Decimal::new(40, 0));
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.units(), 5);

        assert!(cart.remove(a.id));
        assert_eq!(cart.total(), Decimal::new(10, 0));
        assert_eq!(cart.count(), 1);
    }

    #[test]
    fn test_adding_existing_product_merges_lines() {
        let p = product(1, 10, 10);
        let mut cart = cart();
        cart.add(&p, 2).unwrap();
        assert_eq!(cart.add(&p, 3).unwrap(), 5);
        assert_eq!(cart.count(), 1);
        assert_eq!(cart.line(p.id).unwrap().quantity, 5);
        assert_eq!(cart.line(p.id).unwrap().farmer_label, "Meena");
    }

    #[test]
    fn test_can_add_tracks_reserved_units() {
        let p = product(1, 10, 2);
        let mut cart = cart();
        assert!(cart.can_add(&p));
        cart.add(&p, 2).unwrap();
        assert!(!cart.can_add(&p));
        assert_eq!(cart.available(&p), 0);
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut cart = cart();
        for q in [0, -2] {
            let err = cart.add(&product(1, 10, 10), q).unwrap_err();
            assert_eq!(err, CartError::InvalidQuantity(q));
        }
        assert!(cart.is_empty());
    }

    #[test]
    fn test_reject_policy_refuses_over_stock() {
        let p = product(1, 10, 3);
        let mut cart = cart();
        cart.add(&p, 2).unwrap();

        let err = cart.add(&p, 2).unwrap_err();
        assert_eq!(
            err,
            CartError::InsufficientStock {
                requested: 2,
                available: 1
            }
        );
        assert_eq!(err.user_message(), "Not enough stock available (only 1 left)");
        assert_eq!(cart.line(p.id).unwrap().quantity, 2);
    }

    #[test]
    fn test_clamp_policy_reduces_to_available() {
        let x = product(9, 10, 3);
        let mut cart = cart().with_policy(AddPolicy::Clamp);
        assert_eq!(cart.add(&x, 5).unwrap(), 3);
        assert_eq!(cart.line(x.id).unwrap().quantity, 3);

        let err = cart.add(&x, 1).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 0, .. }));
        assert_eq!(err.user_message(), "Not enough stock available");
    }

    #[test]
    fn test_quantity_never_exceeds_max_stock() {
        let p = product(1, 10, 4);
        let mut cart = cart().with_policy(AddPolicy::Clamp);
        for q in [1, 2, 7, 1] {
            let _ = cart.add(&p, q);
            let line = cart.line(p.id).unwrap();
            assert!(line.quantity >= 1 && line.quantity <= line.max_stock);
        }
    }

    #[test]
    fn test_set_quantity_clamps() {
        let p = product(1, 10, 5);
        let mut cart = cart();
        cart.add(&p, 2).unwrap();

        assert_eq!(cart.set_quantity(p.id, 0), Some(1));
        assert_eq!(cart.set_quantity(p.id, -4), Some(1));
        assert_eq!(cart.set_quantity(p.id, 99), Some(5));
        assert_eq!(cart.set_quantity(p.id, 3), Some(3));
        assert_eq!(cart.set_quantity(ProductId::new(42), 3), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let p = product(1, 10, 5);
        let mut cart = cart();
        cart.add(&p, 1).unwrap();
        assert!(cart.remove(p.id));
        assert!(!cart.remove(p.id));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_snapshot_round_trips_through_store() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::restore(Arc::clone(&store));
        cart.add(&product(1, 10, 10), 3).unwrap();
        cart.add(&product(2, 5, 10), 2).unwrap();
        cart.set_quantity(ProductId::new(2), 4);

        let restored = CartStore::restore(Arc::clone(&store));
        assert_eq!(restored.lines(), cart.lines());
        assert_eq!(restored.total(), Decimal::new(50, 0));
    }

    #[test]
    fn test_decimal_prices_survive_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let mut p = product(1, 0, 10);
        p.price = Decimal::new(1999, 2);
        CartStore::restore(Arc::clone(&store)).add(&p, 3).unwrap();

        let restored = CartStore::restore(store);
        assert_eq!(restored.total(), Decimal::new(5997, 2));
    }

    #[test]
    fn test_clear_overwrites_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let mut cart = CartStore::restore(Arc::clone(&store));
        cart.add(&product(1, 10, 10), 1).unwrap();
        cart.clear();

        assert_eq!(store.get(keys::CART).as_deref(), Some("[]"));
        assert!(CartStore::restore(store).is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_restores_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::CART, "{ definitely not a cart").unwrap();
        assert!(CartStore::restore(Arc::clone(&store)).is_empty());

        store.set(keys::CART, r#"[{"productId":"x"}]"#).unwrap();
        assert!(CartStore::restore(store).is_empty());
    }

    #[test]
    fn test_duplicate_and_empty_lines_dropped_on_restore() {
        let store = Arc::new(MemoryStore::new());
        let snapshot = r#"[
            {"productId":1,"name":"A","unitPrice":"10","quantity":2,"maxStock":5,"farmerLabel":"N/A"},
            {"productId":1,"name":"A","unitPrice":"10","quantity":1,"maxStock":5,"farmerLabel":"N/A"},
            {"productId":2,"name":"B","unitPrice":5,"quantity":0,"maxStock":5}
        ]"#;
        store.set(keys::CART, snapshot).unwrap();

        let cart = CartStore::restore(store);
        assert_eq!(cart.count(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 2);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("Clamp".parse::<AddPolicy>().unwrap(), AddPolicy::Clamp);
        assert_eq!(" reject ".parse::<AddPolicy>().unwrap(), AddPolicy::Reject);
        assert!("maybe".parse::<AddPolicy>().is_err());
        assert_eq!(AddPolicy::Clamp.to_string(), "clamp");
    }
}
