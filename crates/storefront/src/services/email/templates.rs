//! Confirmation email content.

use askama::Template;
use chrono::{DateTime, NaiveDate, Utc};
use servicehub_core::Price;

use super::{EmailError, OutgoingEmail};

pub const BOOKING_SUBJECT: &str = "Booking confirmation";
pub const ORDER_SUBJECT: &str = "Order confirmation (test mode)";

/// Fields of a booking confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfirmation {
    pub to: String,
    pub user_name: Option<String>,
    pub service_name: String,
    /// ISO timestamp of the slot (`bookingDate`).
    pub booking_date_iso: String,
    /// `HH:MM`.
    pub booking_time: String,
    pub duration_minutes: u32,
    pub price: Price,
}

/// One line of an order confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub item: String,
    pub purchase_type: String,
    pub quantity: u32,
    pub unit_price: Price,
}

/// Fields of an order confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub to: String,
    pub user_name: Option<String>,
    pub lines: Vec<OrderLine>,
    pub subtotal: Price,
    pub total: Price,
    pub purchase_date_iso: String,
}

#[derive(Template)]
#[template(path = "email/booking_confirmation.html")]
struct BookingHtml<'a> {
    greeting: &'a str,
    service_name: &'a str,
    date: &'a str,
    time: &'a str,
    duration_minutes: u32,
    price: &'a str,
}

#[derive(Template)]
#[template(path = "email/booking_confirmation.txt")]
struct BookingText<'a> {
    greeting: &'a str,
    service_name: &'a str,
    date: &'a str,
    time: &'a str,
    duration_minutes: u32,
    price: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderHtml<'a> {
    greeting: &'a str,
    order_date: &'a str,
    lines: &'a [OrderLine],
    subtotal: &'a str,
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderText<'a> {
    greeting: &'a str,
    order_date: &'a str,
    lines: &'a [OrderLine],
    subtotal: &'a str,
    total: &'a str,
}

/// `" Jo"` for a named customer, empty otherwise ("Hi Jo," / "Hi,").
fn greeting(user_name: Option<&str>) -> String {
    user_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map_or_else(String::new, |n| format!(" {n}"))
}

/// Long date from an ISO date or timestamp; unparseable input is shown as-is.
fn long_date(iso: &str) -> String {
    iso.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map_or_else(|| iso.to_string(), |d| d.format("%B %-d, %Y").to_string())
}

/// Date and time from an ISO timestamp, e.g. "October 18, 2026, 9:05 AM UTC".
fn long_timestamp(iso: &str) -> String {
    DateTime::parse_from_rfc3339(iso).map_or_else(
        |_| long_date(iso),
        |at| {
            at.with_timezone(&Utc)
                .format("%B %-d, %Y, %-I:%M %p UTC")
                .to_string()
        },
    )
}

impl BookingConfirmation {
    /// Render subject, text and HTML.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Template`] if a template fails to render.
    pub fn render(&self) -> Result<OutgoingEmail, EmailError> {
        let greeting = greeting(self.user_name.as_deref());
        let date = long_date(&self.booking_date_iso);
        let price = self.price.to_string();

        let text = BookingText {
            greeting: &greeting,
            service_name: &self.service_name,
            date: &date,
            time: &self.booking_time,
            duration_minutes: self.duration_minutes,
            price: &price,
        }
        .render()?;
        let html = BookingHtml {
            greeting: &greeting,
            service_name: &self.service_name,
            date: &date,
            time: &self.booking_time,
            duration_minutes: self.duration_minutes,
            price: &price,
        }
        .render()?;

        Ok(OutgoingEmail {
            to: self.to.clone(),
            subject: BOOKING_SUBJECT.to_string(),
            text,
            html,
        })
    }
}

impl OrderConfirmation {
    /// Render subject, text and HTML.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Template`] if a template fails to render.
    pub fn render(&self) -> Result<OutgoingEmail, EmailError> {
        let greeting = greeting(self.user_name.as_deref());
        let order_date = long_timestamp(&self.purchase_date_iso);
        let subtotal = self.subtotal.to_string();
        let total = self.total.to_string();

        let text = OrderText {
            greeting: &greeting,
            order_date: &order_date,
            lines: &self.lines,
            subtotal: &subtotal,
            total: &total,
        }
        .render()?;
        let html = OrderHtml {
            greeting: &greeting,
            order_date: &order_date,
            lines: &self.lines,
            subtotal: &subtotal,
            total: &total,
        }
        .render()?;

        Ok(OutgoingEmail {
            to: self.to.clone(),
            subject: ORDER_SUBJECT.to_string(),
            text,
            html,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn booking() -> BookingConfirmation {
        BookingConfirmation {
            to: "jo@example.com".into(),
            user_name: Some("Jo".into()),
            service_name: "Massage Therapy".into(),
            booking_date_iso: "2026-10-20T14:30:00.000Z".into(),
            booking_time: "14:30".into(),
            duration_minutes: 60,
            price: Price::from_cents(8900),
        }
    }

    #[test]
    fn test_booking_text() {
        let email = booking().render().unwrap();
        assert_eq!(email.subject, "Booking confirmation");
        assert_eq!(
            email.text.trim_end(),
            "Hi Jo,\n\nYour booking is confirmed:\n\nService: Massage Therapy\nDate: October 20, 2026\nTime: 14:30\nDuration: 60 minutes\nPrice: $89.00\n\n— ServiceHub"
        );
        assert!(email.html.contains("<strong>Service:</strong> Massage Therapy"));
    }

    #[test]
    fn test_anonymous_greeting() {
        let mut b = booking();
        b.user_name = Some("  ".into());
        assert!(b.render().unwrap().text.starts_with("Hi,\n"));
    }

    #[test]
    fn test_html_is_escaped() {
        let mut b = booking();
        b.service_name = "<script>".into();
        let email = b.render().unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&#60;script&#62;"));
        assert!(email.text.contains("Service: <script>"));
    }

    #[test]
    fn test_order_text() {
        let order = OrderConfirmation {
            to: "jo@example.com".into(),
            user_name: None,
            lines: vec![OrderLine {
                item: "Premium Wireless Headphones".into(),
                purchase_type: "Electronics".into(),
                quantity: 2,
                unit_price: Price::from_cents(19999),
            }],
            subtotal: Price::from_cents(39998),
            total: Price::from_cents(43998),
            purchase_date_iso: "2026-10-18T09:05:00.000Z".into(),
        };
        let email = order.render().unwrap();
        assert_eq!(email.subject, "Order confirmation (test mode)");
        assert!(email.text.starts_with("Hi,\n\nThanks for your order! (This is a TEST — no real payment was processed.)"));
        assert!(email.text.contains("Order date: October 18, 2026, 9:05 AM UTC"));
        assert!(email.text.contains("- Premium Wireless Headphones (Electronics) x2 — $199.99 each"));
        assert!(email.text.contains("Subtotal: $399.98\nTotal: $439.98"));
        assert!(email.html.contains("× 2"));
    }

    #[test]
    fn test_dates_fall_back_to_input() {
        assert_eq!(long_date("soon"), "soon");
        assert_eq!(long_timestamp("2026-10-20"), "October 20, 2026");
    }
}
