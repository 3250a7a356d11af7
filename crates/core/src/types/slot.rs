//! Booking slot: a calendar date plus a wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`BookingSlot`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("date must be in YYYY-MM-DD format")]
    InvalidDate,
    #[error("time must be in HH:MM format")]
    InvalidTime,
}

/// A requested booking slot.
///
/// Slots carry no timezone; they are stored as UTC so the remote
/// `bookingDate` attribute sorts the same way the customer reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingSlot {
    date: NaiveDate,
    time: NaiveTime,
}

impl BookingSlot {
    /// Parse a slot from form values (`YYYY-MM-DD`, `HH:MM`).
    ///
    /// # Errors
    ///
    /// Returns [`SlotError`] naming the field that failed to parse.
    pub fn parse(date: &str, time: &str) -> Result<Self, SlotError> {
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| SlotError::InvalidDate)?;
        let time =
            NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| SlotError::InvalidTime)?;
        Ok(Self { date, time })
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub const fn time(&self) -> NaiveTime {
        self.time
    }

    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        NaiveDateTime::new(self.date, self.time).and_utc()
    }

    /// ISO-8601 timestamp, e.g. `2026-10-20T14:30:00.000Z`.
    #[must_use]
    pub fn iso(&self) -> String {
        self.starts_at().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// `HH:MM`, as stored in `bookingTime`.
    #[must_use]
    pub fn time_hhmm(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    /// Long human date, e.g. `October 20, 2026`.
    #[must_use]
    pub fn long_date(&self) -> String {
        self.date.format("%B %-d, %Y").to_string()
    }
}
