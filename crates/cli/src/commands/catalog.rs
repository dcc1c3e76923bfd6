//! Catalog listing.

use agritrade_core::Price;
use agritrade_retailer::RetailerState;
use agritrade_retailer::api::MarketplaceApi;

/// List products with the units still addable given the current cart.
pub async fn list(state: &RetailerState) -> agritrade_retailer::Result<()> {
    let products = state.client().list_products().await?;
    let cart = state.cart();
    let currency = state.config().checkout.currency;

    if products.is_empty() {
        println!("No products available.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<28} {:>12} {:>7} {:>9}  {}",
        "ID", "NAME", "PRICE", "STOCK", "ADDABLE", "FARMER"
    );
    for product in &products {
        let addable = if cart.can_add(product) {
            cart.available(product).to_string()
        } else {
            "sold out".to_string()
        };
        println!(
            "{:>6}  {:<28} {:>12} {:>7} {:>9}  {}",
            product.id,
            product.name,
            Price::new(product.price, currency).to_string(),
            product.stock,
            addable,
            product.farmer_label(),
        );
    }
    Ok(())
}
