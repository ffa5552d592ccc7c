//! Shopfront Core - Shared catalog and cart types.
//!
//! This crate provides the types used by every Shopfront component:
//! - `storefront` - Remote client, cart store and catalog view
//! - `cli` - Command-line front end for browsing and editing the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Cart arithmetic (merging lines, pricing, totals) lives
//! here so it can be tested without a remote service.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices and quantities
//! - [`product`] - Products and the catalog lookup table
//! - [`cart`] - Cart lines, merging and totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod product;
pub mod types;

pub use cart::{Cart, CartLine, PricedLine};
pub use product::{Catalog, Product};
pub use types::*;
