//! Session cart.
//!
//! The cart is a plain list of catalog lines kept in the customer's session.
//! Nothing here talks to the backend; checkout consumes the lines and
//! expands each one into per-unit remote records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Largest quantity a single cart line can hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("item {0} is not in the cart")]
    NotInCart(ProductId),
    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}")]
    InvalidQuantity,
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    /// Catalog category; stored remotely as the purchase type.
    pub category: String,
    pub unit_price: Price,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// Derived cart figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal: Price,
    pub tax: Price,
    pub total: Price,
    /// Sum of quantities (not line count).
    pub units: u32,
}

/// The customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` units of a catalog item, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if `quantity` is zero or the
    /// merged line would exceed [`MAX_LINE_QUANTITY`].
    pub fn add(
        &mut self,
        product_id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self.line_mut(product_id) {
            let merged = line.quantity.saturating_add(quantity);
            if merged > MAX_LINE_QUANTITY {
                return Err(CartError::InvalidQuantity);
            }
            line.quantity = merged;
            return Ok(());
        }

        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }

        self.items.push(CartItem {
            product_id,
            name: name.into(),
            category: category.into(),
            unit_price,
            quantity,
        });
        Ok(())
    }

    /// Set a line's quantity. A quantity of zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] for unknown lines and
    /// [`CartError::InvalidQuantity`] above [`MAX_LINE_QUANTITY`].
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove(product_id);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }
        let line = self
            .line_mut(product_id)
            .ok_or(CartError::NotInCart(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the line does not exist.
    pub fn remove(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|line| line.product_id != product_id);
        if self.items.len() == before {
            return Err(CartError::NotInCart(product_id));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Subtotal, tax at `tax_percent` and grand total.
    #[must_use]
    pub fn totals(&self, tax_percent: Decimal) -> CartTotals {
        let subtotal = self.subtotal();
        let tax = subtotal.percent(tax_percent);
        CartTotals {
            subtotal,
            tax,
            total: subtotal + tax,
            units: self.unit_count(),
        }
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headphones() -> (ProductId, &'static str, &'static str, Price) {
        (
            ProductId::new(1),
            "Premium Wireless Headphones",
            "Electronics",
            Price::from_cents(19_999),
        )
    }

    fn cart_with(quantity: u32) -> Cart {
        let (id, name, category, price) = headphones();
        let mut cart = Cart::new();
        cart.add(id, name, category, price, quantity).unwrap();
        cart
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = cart_with(1);
        let (id, name, category, price) = headphones();
        cart.add(id, name, category, price, 2).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.unit_count(), 3);
    }

    #[test]
    fn test_add_rejects_zero_and_overflow() {
        let mut cart = Cart::new();
        let (id, name, category, price) = headphones();
        assert_eq!(
            cart.add(id, name, category, price, 0),
            Err(CartError::InvalidQuantity)
        );

        let mut cart = cart_with(MAX_LINE_QUANTITY);
        assert_eq!(
            cart.add(id, name, category, price, 1),
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(cart.unit_count(), MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = cart_with(2);
        cart.set_quantity(ProductId::new(1), 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_line() {
        let mut cart = Cart::new();
        assert_eq!(
            cart.set_quantity(ProductId::new(9), 1),
            Err(CartError::NotInCart(ProductId::new(9)))
        );
    }

    #[test]
    fn test_lines_never_hold_zero() {
        let mut cart = cart_with(1);
        cart.set_quantity(ProductId::new(1), 5).unwrap();
        cart.set_quantity(ProductId::new(1), 0).unwrap();
        assert!(cart.items().iter().all(|line| line.quantity >= 1));
    }

    #[test]
    fn test_totals_are_decimal_exact() {
        let cart = cart_with(2);
        let totals = cart.totals(Decimal::TEN);

        assert_eq!(totals.subtotal, Price::from_cents(39_998));
        assert_eq!(totals.tax, Price::from_cents(4_000));
        assert_eq!(totals.total, Price::from_cents(43_998));
        assert_eq!(totals.units, 2);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut cart = cart_with(1);
        assert_eq!(
            cart.remove(ProductId::new(2)),
            Err(CartError::NotInCart(ProductId::new(2)))
        );
        cart.remove(ProductId::new(1)).unwrap();
        assert!(cart.is_empty());

        let mut cart = cart_with(3);
        cart.clear();
        assert_eq!(cart.unit_count(), 0);
        assert_eq!(cart.subtotal(), Price::ZERO);
    }

    #[test]
    fn test_session_serialization_keeps_lines() {
        let cart = cart_with(2);
        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
