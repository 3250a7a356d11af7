//! Domain models for the storefront.
//!
//! - [`session`] - identity, cart and flash messages kept in the server-side session
//! - [`booking`] - booking requests and the normalized view of stored bookings

pub mod booking;
pub mod session;

pub use booking::{Booking, BookingInputError, BookingRequest, RescheduleRequest};
pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
