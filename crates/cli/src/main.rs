//! AgriTrade CLI - retailer cart, checkout and delivery tracking.
//!
//! # Usage
//!
//! ```bash
//! # Record the identity issued by the marketplace login
//! agri-cli identity set --id 7 --name "Asha Traders" --role retailer --token "$TOKEN"
//!
//! # Browse and fill the cart
//! agri-cli products
//! agri-cli cart add 12 --quantity 3
//! agri-cli cart show
//!
//! # Place orders and pay
//! agri-cli checkout
//!
//! # Follow a delivery
//! agri-cli track 4
//! ```
//!
//! # Commands
//!
//! - `products` - List the catalog with what is still addable
//! - `cart` - Show or edit the cart
//! - `checkout` - Place one order per cart line and pay for them
//! - `track` - Follow a delivery agent's live position
//! - `identity` - Record or show the signed-in user
//! - `logout` - Forget the user and the cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use agritrade_core::{DeliveryAgentId, ProductId, UserId, UserRole};
use agritrade_retailer::config::RetailerConfig;
use agritrade_retailer::{RetailerError, RetailerState, telemetry};
use clap::{Parser, Subcommand};

mod commands;
mod widget;

#[derive(Parser)]
#[command(name = "agri-cli")]
#[command(author, version, about = "AgriTrade retailer client")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products,
    /// Show or edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place orders for the cart and pay for them
    Checkout,
    /// Follow a delivery agent's position until interrupted
    Track {
        /// Delivery agent id
        agent: DeliveryAgentId,

        /// Exit after the first position
        #[arg(long)]
        once: bool,
    },
    /// Record or show the signed-in user
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// Forget the signed-in user and the cart
    Logout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Add a product
    Add {
        /// Product id
        product: ProductId,

        /// Units to add
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set a line's quantity (clamped to stock)
    Set {
        /// Product id
        product: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product id
        product: ProductId,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum IdentityAction {
    /// Show the signed-in user
    Show,
    /// Record a user and token issued by the marketplace login
    Set {
        /// User id
        #[arg(long)]
        id: UserId,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,

        /// Role (`retailer`, `farmer`, `admin`, `delivery_agent`)
        #[arg(short, long, default_value = "retailer")]
        role: UserRole,

        /// Bearer token
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match RetailerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(cli.json_logs);
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(cli.json_logs);

    let result = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        commands::report(&e);
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: RetailerConfig) -> Result<(), RetailerError> {
    let state = RetailerState::open(config)?;

    match cli.command {
        Commands::Products => commands::catalog::list(&state).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state),
            CartAction::Add { product, quantity } => {
                commands::cart::add(&state, product, quantity).await?;
            }
            CartAction::Set { product, quantity } => {
                commands::cart::set(&state, product, quantity)?;
            }
            CartAction::Remove { product } => commands::cart::remove(&state, product),
            CartAction::Clear => commands::cart::clear(&state),
        },
        Commands::Checkout => commands::checkout::run(&state).await?,
        Commands::Track { agent, once } => commands::track::follow(&state, agent, once).await,
        Commands::Identity { action } => match action {
            IdentityAction::Show => commands::identity::show(&state),
            IdentityAction::Set {
                id,
                name,
                email,
                role,
                token,
            } => commands::identity::set(&state, id, name, email, role, token.as_deref())?,
        },
        Commands::Logout => commands::identity::logout(&state)?,
    }
    Ok(())
}
