//! Cart commands.
//!
//! Each command starts a session (catalog + cart load), applies one intent,
//! prints the resulting cart and ends the session, which retries any line
//! that failed to sync. Nothing outlives the process: a change the remote
//! never accepted is lost.

use shopfront_core::{ProductId, Quantity};
use shopfront_storefront::cart::{SyncOutcome, SyncReport};
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::error::Result;
use shopfront_storefront::session::ShopSession;
use shopfront_storefront::view::CartView;
use tracing::info;

/// Print the cart.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn show(config: StorefrontConfig) -> Result<()> {
    let session = ShopSession::start(config).await?;
    render(&session.cart_view());
    session.end().await;
    Ok(())
}

/// Add units of a product.
///
/// # Errors
///
/// Returns an error if the quantity is zero, the catalog cannot be fetched or
/// the product is unknown.
pub async fn add(config: StorefrontConfig, product_id: String, quantity: u32) -> Result<()> {
    let quantity = Quantity::new(quantity)?;
    let session = ShopSession::start(config).await?;

    let outcome = session
        .add_product(ProductId::new(product_id), quantity)
        .await?;
    info!(?outcome, "Add to cart finished");

    finish(session, outcome).await;
    Ok(())
}

/// Set a line's quantity, clamping to at least one.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn set(config: StorefrontConfig, product_id: String, quantity: i64) -> Result<()> {
    let session = ShopSession::start(config).await?;

    let outcome = session
        .cart()
        .update_quantity(ProductId::new(product_id), Quantity::clamped(quantity))
        .await;
    info!(?outcome, "Quantity update finished");

    finish(session, outcome).await;
    Ok(())
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn remove(config: StorefrontConfig, product_id: String) -> Result<()> {
    let session = ShopSession::start(config).await?;

    let outcome = session.cart().remove_item(&ProductId::new(product_id)).await;
    info!(?outcome, "Removal finished");

    finish(session, outcome).await;
    Ok(())
}

async fn finish(session: ShopSession, outcome: SyncOutcome) {
    render_outcome(outcome);
    render(&session.cart_view());
    let report = session.end().await;
    render_report(&report);
}

#[allow(clippy::print_stdout)]
fn render_outcome(outcome: SyncOutcome) {
    if let Some(message) = outcome_message(outcome) {
        println!("{message}");
    }
}

fn outcome_message(outcome: SyncOutcome) -> Option<&'static str> {
    match outcome {
        SyncOutcome::Synced | SyncOutcome::Superseded => None,
        SyncOutcome::Pending => Some("The remote cart did not accept the change, retrying."),
        SyncOutcome::Unchanged => Some("Nothing to change."),
        SyncOutcome::Failed => Some("The remote cart rejected the change."),
    }
}

#[allow(clippy::print_stdout)]
fn render(view: &CartView) {
    if let Some(notice) = &view.notice {
        println!("{notice}");
    }
    if let Some(error) = &view.load_error {
        println!("Could not load cart: {error}");
    }
    if view.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for item in &view.items {
        let marker = if item.pending { " (not synced)" } else { "" };
        println!(
            "{:<26} {:>4} x {:>10} = {:>10}  {}{}",
            item.product_id, item.quantity, item.price, item.line_price, item.title, marker
        );
    }
    println!("{} items, total {}", view.item_count, view.subtotal);
}

#[allow(clippy::print_stdout)]
fn render_report(report: &SyncReport) {
    for message in report_messages(report) {
        println!("{message}");
    }
}

/// Lines for changes the session could not save before exiting.
fn report_messages(report: &SyncReport) -> Vec<String> {
    let reverted = report
        .rolled_back
        .iter()
        .map(|id| format!("Change to {id} could not be saved and was reverted."));
    let unsaved = report
        .still_pending
        .iter()
        .map(|id| format!("Change to {id} was not saved; the remote cart keeps its old value."));
    reverted.chain(unsaved).collect()
}
