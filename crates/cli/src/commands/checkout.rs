//! Checkout with the terminal payment widget.

use agritrade_core::join_order_ids;
use agritrade_retailer::RetailerState;

use crate::widget::TerminalWidget;

/// Place one order per cart line, then collect payment at the terminal.
///
/// The cart is kept unless the payment is verified.
pub async fn run(state: &RetailerState) -> agritrade_retailer::Result<()> {
    let user = state.require_retailer()?;
    let mut cart = state.cart();
    let mut checkout = state.checkout();
    let mut widget = TerminalWidget::new();

    println!("Placing {} order(s) for {}...", cart.count(), user.name);
    let receipt = checkout.checkout(&mut cart, &user, &mut widget).await?;

    println!("Payment successful. Orders confirmed!");
    println!("  Orders:  {}", join_order_ids(&receipt.order_ids));
    println!("  Total:   {}", receipt.total);
    println!("  Payment: {}", receipt.payment_id);
    println!("  At:      {}", receipt.completed_at.to_rfc3339());
    Ok(())
}
