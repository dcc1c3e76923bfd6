//! Client-side stock checks.
//!
//! Advisory only: the backend decrements stock when an order is created and
//! may still refuse a line that passed here.

use crate::api::Product;

use super::CartLine;

/// Units of `product` that can still be added given what `lines` already
/// reserve. May be negative if the catalog stock dropped after an add.
#[must_use]
pub fn available(product: &Product, lines: &[CartLine]) -> i64 {
    let reserved = lines
        .iter()
        .find(|line| line.product_id == product.id)
        .map_or(0, |line| i64::from(line.quantity));
    product.stock.saturating_sub(reserved)
}

/// Whether an add action for `product` should be offered at all.
#[must_use]
pub fn can_add(product: &Product, lines: &[CartLine]) -> bool {
    available(product, lines) > 0
}
