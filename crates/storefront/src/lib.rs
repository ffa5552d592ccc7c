//! Shopfront storefront library.
//!
//! Keeps a user's cart consistent with a remote REST cart service and exposes
//! the product catalog, as plain view models for any front end.
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::{config::StorefrontConfig, session::ShopSession};
//!
//! let session = ShopSession::start(StorefrontConfig::from_env()?).await?;
//! session.add_product(ProductId::new("p1"), Quantity::ONE).await?;
//! println!("{}", session.cart_view().subtotal);
//! session.end().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod notice;
pub mod remote;
pub mod session;
pub mod view;
