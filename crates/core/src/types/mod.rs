//! Core types for ServiceHub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod slot;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::Price;
pub use slot::{BookingSlot, SlotError};
pub use status::BookingStatus;
