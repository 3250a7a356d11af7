//! JSON API routes.

pub mod notifications;
