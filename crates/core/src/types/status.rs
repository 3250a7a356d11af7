//! Booking status.
//!
//! The remote `status` attribute is free text written by several generations
//! of the app and by hand in the admin console, so parsing is lenient:
//! spelling variants ("canceled"), casing, and separators are normalized.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Scheduled,
    Cancelled,
    RescheduleRequested,
    Completed,
}

impl BookingStatus {
    /// Canonical value written to the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Cancelled => "cancelled",
            Self::RescheduleRequested => "reschedule_requested",
            Self::Completed => "completed",
        }
    }

    /// Human label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Cancelled => "Cancelled",
            Self::RescheduleRequested => "Reschedule requested",
            Self::Completed => "Completed",
        }
    }

    /// Lenient parse of a stored status value.
    ///
    /// Returns `None` for blank input so callers can keep looking at other
    /// attribute variants. Unrecognized non-blank text is treated as
    /// scheduled.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        if key.is_empty() {
            return None;
        }

        Some(match key.as_str() {
            "cancelled" | "canceled" | "cancel" => Self::Cancelled,
            "reschedulerequested" | "reschedulerequest" | "rescheduling" => {
                Self::RescheduleRequested
            }
            "completed" | "complete" | "done" => Self::Completed,
            _ => Self::Scheduled,
        })
    }

    /// Whether the customer may still cancel or ask to reschedule.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::RescheduleRequested)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
