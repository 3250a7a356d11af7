//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Account signup, signin, verification and recovery
//! - `bookings` - Booking lifecycle against the appointments collection
//! - `checkout` - Cart checkout into the items and purchases collections
//! - `email` - Booking and order confirmations (Resend, SMTP fallback)
//! - `persistence` - Candidate-payload writes for drifting collection schemas
//! - `users` - Mirror of each account in the users collection

pub mod auth;
pub mod bookings;
pub mod checkout;
pub mod email;
pub mod persistence;
pub mod users;
