//! Cart editing.

use agritrade_core::{Price, ProductId};
use agritrade_retailer::api::MarketplaceApi;
use agritrade_retailer::{RetailerError, RetailerState};

/// Print every line, the distinct line count and the total.
pub fn show(state: &RetailerState) {
    let cart = state.cart();
    let currency = state.config().checkout.currency;

    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }

    for line in cart.lines() {
        println!(
            "{:>6}  {:<28} {:>4} x {:>10} = {:>12}  ({})",
            line.product_id,
            line.name,
            line.quantity,
            Price::new(line.unit_price, currency).to_string(),
            Price::new(line.subtotal(), currency).to_string(),
            line.farmer_label,
        );
    }
    println!(
        "{} item(s), {} unit(s), total {}",
        cart.count(),
        cart.units(),
        Price::new(cart.total(), currency)
    );
}

/// Add a catalog product. The product is looked up so the line snapshots
/// its current name, price and stock.
pub async fn add(
    state: &RetailerState,
    product_id: ProductId,
    quantity: i64,
) -> agritrade_retailer::Result<()> {
    let products = state.client().list_products().await?;
    let product = products
        .iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| RetailerError::NotFound(format!("Product {product_id}")))?;

    let mut cart = state.cart();
    let now = cart.add(product, quantity)?;
    println!("{} in cart: {now}", product.name);
    Ok(())
}

/// Set a line's quantity; out-of-range values are clamped.
pub fn set(
    state: &RetailerState,
    product_id: ProductId,
    quantity: i64,
) -> agritrade_retailer::Result<()> {
    let mut cart = state.cart();
    let stored = cart
        .set_quantity(product_id, quantity)
        .ok_or_else(|| RetailerError::NotFound(format!("Cart line for product {product_id}")))?;
    if i64::from(stored) == quantity {
        println!("Quantity set to {stored}");
    } else {
        println!("Quantity adjusted to {stored} to stay within stock");
    }
    Ok(())
}

pub fn remove(state: &RetailerState, product_id: ProductId) {
    if state.cart().remove(product_id) {
        println!("Removed product {product_id}");
    } else {
        println!("Product {product_id} was not in the cart");
    }
}

pub fn clear(state: &RetailerState) {
    state.cart().clear();
    println!("Cart cleared");
}
