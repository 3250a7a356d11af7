//! ServiceHub Core - Shared domain types.
//!
//! This crate provides the types used across the ServiceHub components:
//! - `storefront` - Public storefront, booking pages and notification API
//! - `cli` - Backend probe and seeding tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure data manipulation - no I/O,
//! no HTTP clients. The cart lives here because it never talks to the
//! backend; it is serialized into the session and handed to checkout.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, booking slots and statuses
//! - [`cart`] - Session cart with quantity controls and totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{Cart, CartError, CartItem, CartTotals};
pub use types::*;
