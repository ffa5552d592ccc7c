//! Catalog listing.

use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::error::Result;
use shopfront_storefront::session::ShopSession;
use shopfront_storefront::view::ProductCardView;

/// Print every product in the catalog.
///
/// # Errors
///
/// Returns an error if the catalog cannot be fetched.
pub async fn list(config: StorefrontConfig) -> Result<()> {
    let session = ShopSession::start(config).await?;
    render(&session.product_cards());
    session.end().await;
    Ok(())
}

#[allow(clippy::print_stdout)]
fn render(cards: &[ProductCardView]) {
    if cards.is_empty() {
        println!("No products available.");
        return;
    }

    for card in cards {
        println!("{:<26} {:>10}  {}", card.id, card.price, card.name);
        if !card.description.is_empty() {
            println!("{:<26} {}", "", card.description);
        }
    }
}
