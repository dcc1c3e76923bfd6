//! Payment widget backed by the terminal.
//!
//! Shows the amount and gateway order, then asks for the payment id and
//! signature the gateway issued. A blank payment id dismisses the widget;
//! `fail <code> [description]` reports a gateway failure.

#![allow(clippy::print_stdout)]

use std::io::Write;

use agritrade_retailer::checkout::{
    GatewayFailure, PaymentConfirmation, PaymentWidget, WidgetEvent, WidgetRequest,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub struct TerminalWidget {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalWidget {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn prompt(&mut self, label: &str) -> Option<String> {
        print!("{label}: ");
        let _ = std::io::stdout().flush();
        match self.lines.next_line().await {
            Ok(Some(line)) => Some(line.trim().to_string()),
            Ok(None) | Err(_) => None,
        }
    }
}

impl Default for TerminalWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentWidget for TerminalWidget {
    async fn open(&mut self, request: &WidgetRequest) -> WidgetEvent {
        println!();
        println!("=== {} - {} ===", request.merchant, request.description);
        println!("Amount:        {}", request.display_amount());
        println!("Gateway order: {}", request.gateway_order_id);
        println!("Gateway key:   {}", request.key);
        println!();

        let Some(payment_id) = self.prompt("Payment id (blank to cancel)").await else {
            return WidgetEvent::Dismissed;
        };
        if payment_id.is_empty() {
            return WidgetEvent::Dismissed;
        }

        if let Some(rest) = payment_id.strip_prefix("fail") {
            let mut parts = rest.trim().splitn(2, ' ');
            let code = parts.next().filter(|c| !c.is_empty()).map(str::to_string);
            let description = parts.next().map(|d| d.trim().to_string());
            return WidgetEvent::Failed(GatewayFailure { code, description });
        }

        let signature = self.prompt("Signature").await.unwrap_or_default();
        WidgetEvent::Authorized(PaymentConfirmation {
            gateway_order_id: request.gateway_order_id.clone(),
            payment_id,
            signature,
        })
    }
}
