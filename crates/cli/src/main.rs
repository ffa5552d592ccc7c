//! Shopfront CLI - browse the catalog and manage the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products
//! shopfront products
//!
//! # Show the cart with its total
//! shopfront cart show
//!
//! # Add two units of a product
//! shopfront cart add 64f1c0 -q 2
//!
//! # Set a line's quantity (values below 1 become 1)
//! shopfront cart set 64f1c0 5
//!
//! # Remove a line
//! shopfront cart remove 64f1c0
//! ```
//!
//! Configuration comes from `SHOPFRONT_*` environment variables (or `.env`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::error::AppError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the product catalog
    Products,
    /// Inspect and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and the total
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity
    Set {
        /// Product ID
        product_id: String,

        /// New quantity (clamped to at least 1)
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line from the cart
    Remove {
        /// Product ID
        product_id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No Sentry DSN without a config; log locally and exit.
            init_tracing();
            let e = AppError::from(e);
            e.report();
            std::process::exit(e.exit_code());
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        e.report();
        let code = e.exit_code();
        // Flush pending Sentry events before exiting
        drop(sentry_guard);
        std::process::exit(code);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), AppError> {
    match cli.command {
        Commands::Products => commands::products::list(config).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(config).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(config, product_id, quantity).await,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(config, product_id, quantity).await,
            CartAction::Remove { product_id } => commands::cart::remove(config, product_id).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_set_accepts_negative_quantity() {
        let cli = Cli::try_parse_from(["shopfront", "cart", "set", "p1", "-3"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Cart {
                action: CartAction::Set { quantity: -3, .. }
            })
        ));
    }

    #[test]
    fn test_cart_sync_is_not_a_command() {
        assert!(Cli::try_parse_from(["shopfront", "cart", "sync"]).is_err());
    }

    #[test]
    fn test_add_defaults_to_one() {
        let cli = Cli::try_parse_from(["shopfront", "cart", "add", "p1"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Cart {
                action: CartAction::Add { quantity: 1, .. }
            })
        ));
    }
}
