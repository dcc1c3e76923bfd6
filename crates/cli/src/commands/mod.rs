//! Subcommand implementations. Each prints its result for a human reader.

#![allow(clippy::print_stdout, clippy::print_stderr)]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod identity;
pub mod track;

use agritrade_retailer::RetailerError;

/// Print the user-facing message for a failed command.
pub fn report(error: &RetailerError) {
    eprintln!("Error: {}", error.user_message());
}
