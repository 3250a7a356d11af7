//! Static product and service catalog.
//!
//! The catalog is compiled in. Product ids are small integers because they
//! are written to the remote `itemID` attribute at checkout.

use rust_decimal::Decimal;
use servicehub_core::{Price, ProductId, ServiceId};

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: &'static str,
    pub description: &'static str,
    pub price: Price,
    pub category: &'static str,
    /// Average rating out of 5, one decimal place.
    pub rating: Decimal,
}

/// A bookable service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: ServiceId,
    pub name: &'static str,
    pub description: &'static str,
    /// Human duration shown on the page, e.g. "3-4 hours".
    pub duration: &'static str,
    /// Duration written to `serviceDuration`.
    pub duration_minutes: u32,
    pub price: Price,
    pub category: &'static str,
    pub rating: Decimal,
}

const fn usd(cents: u32) -> Price {
    Price::usd(Decimal::from_parts(cents, 0, 0, false, 2))
}

const fn stars(tenths: u32) -> Decimal {
    Decimal::from_parts(tenths, 0, 0, false, 1)
}

static PRODUCTS: [Product; 6] = [
    Product {
        id: ProductId::new(1),
        name: "Premium Wireless Headphones",
        description: "High-quality wireless headphones with noise cancellation and 30-hour battery life.",
        price: usd(19_999),
        category: "Electronics",
        rating: stars(48),
    },
    Product {
        id: ProductId::new(2),
        name: "Smart Watch Pro",
        description: "Feature-rich smartwatch with health tracking, GPS, and water resistance.",
        price: usd(29_999),
        category: "Electronics",
        rating: stars(46),
    },
    Product {
        id: ProductId::new(3),
        name: "Organic Coffee Beans",
        description: "Premium organic coffee beans sourced from sustainable farms. 1kg pack.",
        price: usd(2_499),
        category: "Food & Beverage",
        rating: stars(49),
    },
    Product {
        id: ProductId::new(4),
        name: "Yoga Mat Premium",
        description: "Eco-friendly yoga mat with superior grip and cushioning. Perfect for all yoga styles.",
        price: usd(4_999),
        category: "Fitness",
        rating: stars(47),
    },
    Product {
        id: ProductId::new(5),
        name: "Leather Backpack",
        description: "Handcrafted genuine leather backpack with laptop compartment and multiple pockets.",
        price: usd(14_999),
        category: "Fashion",
        rating: stars(45),
    },
    Product {
        id: ProductId::new(6),
        name: "Skincare Set",
        description: "Complete skincare routine set with cleanser, toner, serum, and moisturizer.",
        price: usd(7_999),
        category: "Beauty",
        rating: stars(48),
    },
];

static SERVICES: [Service; 6] = [
    Service {
        id: ServiceId::new(1),
        name: "Professional Photography",
        description: "Professional photo shoot session for portraits, events, or product photography. Includes editing and high-resolution images.",
        duration: "2 hours",
        duration_minutes: 120,
        price: usd(29_900),
        category: "Photography",
        rating: stars(49),
    },
    Service {
        id: ServiceId::new(2),
        name: "Home Cleaning Service",
        description: "Deep cleaning service for your home. Includes all rooms, kitchen, bathrooms, and common areas. Eco-friendly products used.",
        duration: "3-4 hours",
        duration_minutes: 210,
        price: usd(14_900),
        category: "Home Services",
        rating: stars(47),
    },
    Service {
        id: ServiceId::new(3),
        name: "Personal Training Session",
        description: "One-on-one personal training session tailored to your fitness goals. Includes workout plan and nutrition advice.",
        duration: "1 hour",
        duration_minutes: 60,
        price: usd(7_500),
        category: "Fitness",
        rating: stars(48),
    },
    Service {
        id: ServiceId::new(4),
        name: "Web Development Consultation",
        description: "Expert consultation for your web development needs. Includes code review, architecture planning, and best practices.",
        duration: "1.5 hours",
        duration_minutes: 90,
        price: usd(19_900),
        category: "Technology",
        rating: stars(50),
    },
    Service {
        id: ServiceId::new(5),
        name: "Massage Therapy",
        description: "Relaxing full-body massage therapy session. Helps relieve stress, tension, and muscle soreness.",
        duration: "1 hour",
        duration_minutes: 60,
        price: usd(8_900),
        category: "Wellness",
        rating: stars(49),
    },
    Service {
        id: ServiceId::new(6),
        name: "Tutoring Session",
        description: "Personalized tutoring session for students. Covers various subjects including math, science, and languages.",
        duration: "1 hour",
        duration_minutes: 60,
        price: usd(5_000),
        category: "Education",
        rating: stars(46),
    },
];

/// All products, in display order.
#[must_use]
pub fn products() -> &'static [Product] {
    &PRODUCTS
}

#[must_use]
pub fn product(id: ProductId) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Distinct product categories, in first-seen order.
#[must_use]
pub fn product_categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for product in &PRODUCTS {
        if !categories.contains(&product.category) {
            categories.push(product.category);
        }
    }
    categories
}

/// All services, in display order.
#[must_use]
pub fn services() -> &'static [Service] {
    &SERVICES
}

#[must_use]
pub fn service(id: ServiceId) -> Option<&'static Service> {
    SERVICES.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prices_are_exact() {
        assert_eq!(products()[0].price.to_string(), "$199.99");
        assert_eq!(products()[2].price.to_string(), "$24.99");
        assert_eq!(services()[0].price.to_string(), "$299.00");
        assert_eq!(services()[3].rating.to_string(), "5.0");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(product(ProductId::new(5)).map(|p| p.name), Some("Leather Backpack"));
        assert!(product(ProductId::new(7)).is_none());
        assert_eq!(service(ServiceId::new(2)).map(|s| s.duration_minutes), Some(210));
    }

    #[test]
    fn test_categories_deduplicated() {
        let categories = product_categories();
        assert_eq!(categories.len(), 5);
        assert_eq!(categories[0], "Electronics");
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in products().iter().enumerate() {
            assert!(products()[i + 1..].iter().all(|b| b.id != a.id));
        }
    }
}
