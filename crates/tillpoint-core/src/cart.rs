//! # Cart Module
//!
//! The in-memory invoice being built at the register (the "draft").
//!
//! ## Line Merging
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add COFFEE × 2 @ 25.00   ──►  [COFFEE × 2 @ 25.00]                    │
//! │  add COFFEE × 1 @ 25.00   ──►  [COFFEE × 3 @ 25.00]        (merged)    │
//! │  add COFFEE × 1 @ 20.00   ──►  [COFFEE × 3 @ 25.00,                    │
//! │                                 COFFEE × 1 @ 20.00]        (new line)  │
//! │                                                                         │
//! │  Key: (product_id, unit_price)                                         │
//! │  Stock guard: Σ quantity over ALL lines of the product ≤ stock         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation either succeeds or leaves the cart exactly as it was.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Percent;
use crate::validation::{validate_cart_size, validate_percent, validate_price_cents, validate_quantity};
use crate::MAX_INVOICE_CENTS;

// =============================================================================
// Invoice Line
// =============================================================================

/// One line of a draft invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: String,

    /// Name at the time the line was added (printed on the invoice).
    pub product_name: String,

    pub unit_price: Money,
    pub quantity: i64,

    /// Category tax rate at the time the line was added.
    pub tax_rate: Percent,
}

impl InvoiceLine {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
        tax_rate: Percent,
    ) -> Self {
        InvoiceLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            unit_price,
            quantity,
            tax_rate,
        }
    }

    /// `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    #[inline]
    fn matches(&self, product_id: &str, unit_price: Money) -> bool {
        self.product_id == product_id && self.unit_price == unit_price
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A draft invoice: an ordered list of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<InvoiceLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Total quantity of a product across all of its lines.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// `Σ line_total`.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(InvoiceLine::line_total).sum()
    }

    /// Adds a line, merging it into an existing line with the same product
    /// and unit price.
    ///
    /// ## Errors
    /// - [`CoreError::InsufficientStock`] when the product's cumulative
    ///   quantity in the cart would exceed `available_stock`
    /// - [`CoreError::CartTooLarge`] when a new line would not fit
    /// - [`CoreError::AmountTooLarge`] when the subtotal would pass
    ///   [`MAX_INVOICE_CENTS`]
    /// - [`CoreError::Validation`] for non-positive quantities, negative
    ///   prices or tax rates above 100%
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::cart::{Cart, InvoiceLine};
    /// use tillpoint_core::money::Money;
    /// use tillpoint_core::types::Percent;
    ///
    /// let mut cart = Cart::new();
    /// let line = InvoiceLine::new("p1", "Coffee", Money::from_major(25), 2, Percent::zero());
    /// cart.add_or_update_line(line.clone(), 10).unwrap();
    /// cart.add_or_update_line(line, 10).unwrap();
    /// assert_eq!(cart.len(), 1);
    /// assert_eq!(cart.lines()[0].quantity, 4);
    /// ```
    pub fn add_or_update_line(&mut self, line: InvoiceLine, available_stock: i64) -> CoreResult<()> {
        validate_quantity(line.quantity)?;
        validate_price_cents(line.unit_price.cents())?;
        validate_percent("tax rate", line.tax_rate)?;

        let requested = self.quantity_of(&line.product_id).saturating_add(line.quantity);
        if requested > available_stock {
            return Err(CoreError::InsufficientStock {
                product_id: line.product_id,
                available: available_stock,
                requested,
            });
        }
        check_subtotal(self.subtotal(), line.unit_price, line.quantity)?;

        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&line.product_id, line.unit_price))
        {
            existing.quantity += line.quantity;
            return Ok(());
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_LINES,
        })?;
        self.lines.push(line);
        Ok(())
    }

    /// Sets the quantity of a line.
    ///
    /// A quantity of zero or less removes the line. Increases are checked
    /// against `available_stock` the same way as [`Cart::add_or_update_line`];
    /// decreases never fail on stock.
    pub fn change_quantity(
        &mut self,
        product_id: &str,
        unit_price: Money,
        quantity: i64,
        available_stock: i64,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_line(product_id, unit_price)?;
            return Ok(());
        }

        let index = self.position(product_id, unit_price)?;
        let current = self.lines[index].quantity;

        if quantity > current {
            let requested = (self.quantity_of(product_id) - current).saturating_add(quantity);
            if requested > available_stock {
                return Err(CoreError::InsufficientStock {
                    product_id: product_id.to_string(),
                    available: available_stock,
                    requested,
                });
            }
            let others = self.subtotal() - self.lines[index].line_total();
            check_subtotal(others, unit_price, quantity)?;
        }

        self.lines[index].quantity = quantity;
        Ok(())
    }

    /// Removes the line with this product and unit price.
    pub fn remove_line(&mut self, product_id: &str, unit_price: Money) -> CoreResult<InvoiceLine> {
        let index = self.position(product_id, unit_price)?;
        Ok(self.lines.remove(index))
    }

    /// Takes invoiced lines back out of the cart.
    ///
    /// Each invoiced line lowers the matching cart line by its quantity;
    /// lines that reach zero go away. Anything added after the lines were
    /// invoiced stays in the cart.
    pub fn deduct(&mut self, invoiced: &[InvoiceLine]) {
        for done in invoiced {
            if let Some(line) = self
                .lines
                .iter_mut()
                .find(|l| l.matches(&done.product_id, done.unit_price))
            {
                line.quantity -= done.quantity;
            }
        }
        self.lines.retain(|l| l.quantity > 0);
    }

    fn position(&self, product_id: &str, unit_price: Money) -> CoreResult<usize> {
        self.lines
            .iter()
            .position(|l| l.matches(product_id, unit_price))
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: product_id.to_string(),
                unit_price: unit_price.to_string(),
            })
    }
}

/// Fails unless `base + unit_price × quantity` stays within one invoice.
fn check_subtotal(base: Money, unit_price: Money, quantity: i64) -> CoreResult<()> {
    let projected = unit_price
        .checked_mul(quantity)
        .and_then(|added| base.checked_add(added));

    match projected {
        Some(total) if total.cents() <= MAX_INVOICE_CENTS => Ok(()),
        _ => Err(CoreError::AmountTooLarge {
            limit: Money::from_cents(MAX_INVOICE_CENTS),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_CART_LINES;

    fn line(product: &str, price: i64, qty: i64) -> InvoiceLine {
        InvoiceLine::new(product, product.to_uppercase(), Money::from_cents(price), qty, Percent::from_whole(10))
    }

    #[test]
    fn test_same_product_same_price_merges() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 1), 10).unwrap();
        cart.add_or_update_line(line("p1", 1000, 2), 10).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.subtotal().cents(), 3000);
    }

    #[test]
    fn test_same_product_different_price_appends() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 1), 10).unwrap();
        cart.add_or_update_line(line("p1", 800, 1), 10).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of("p1"), 2);
    }

    #[test]
    fn test_stock_guard_is_cumulative_across_lines() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 3), 5).unwrap();
        let before = cart.clone();

        let err = cart.add_or_update_line(line("p1", 900, 3), 5).unwrap_err();
        match err {
            CoreError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cart, before);
    }

    #[test]
    fn test_exact_stock_is_allowed() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 5), 5).unwrap();
        assert_eq!(cart.quantity_of("p1"), 5);
    }

    #[test]
    fn test_rejects_bad_lines() {
        let mut cart = Cart::new();
        assert!(cart.add_or_update_line(line("p1", 1000, 0), 5).is_err());
        assert!(cart.add_or_update_line(line("p1", -1, 1), 5).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_change_quantity() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 2), 4).unwrap();
        let price = Money::from_cents(1000);

        cart.change_quantity("p1", price, 4, 4).unwrap();
        assert_eq!(cart.quantity_of("p1"), 4);

        assert!(cart.change_quantity("p1", price, 5, 4).is_err());
        assert_eq!(cart.quantity_of("p1"), 4);

        // Decrease always allowed, even if stock dropped meanwhile
        cart.change_quantity("p1", price, 1, 0).unwrap();
        assert_eq!(cart.quantity_of("p1"), 1);

        cart.change_quantity("p1", price, 0, 4).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_missing_line() {
        let mut cart = Cart::new();
        let err = cart.remove_line("nope", Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound { .. }));
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            cart.add_or_update_line(line(&format!("p{i}"), 100, 1), 1).unwrap();
        }
        let err = cart.add_or_update_line(line("extra", 100, 1), 1).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { .. }));

        // Merging into an existing line still works at the limit
        cart.add_or_update_line(line("p0", 100, 1), 2).unwrap();
        assert_eq!(cart.quantity_of("p0"), 2);
    }

    #[test]
    fn test_oversized_amount_is_rejected() {
        let mut cart = Cart::new();
        let bulk = InvoiceLine::new(
            "p1",
            "Bulk",
            Money::from_major(100_000),
            1_000_000_000_000,
            Percent::zero(),
        );
        let err = cart.add_or_update_line(bulk, 1_000_000_000_000).unwrap_err();
        assert!(matches!(err, CoreError::AmountTooLarge { .. }));
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());

        // Growing an existing line past the limit fails the same way
        cart.add_or_update_line(line("p2", 100_000_000, 1), i64::MAX).unwrap();
        let before = cart.clone();
        let err = cart
            .change_quantity("p2", Money::from_cents(100_000_000), 20_000_000, i64::MAX)
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountTooLarge { .. }));
        assert_eq!(cart, before);

        // Right at the limit is fine
        cart.change_quantity("p2", Money::from_cents(100_000_000), 10_000_000, i64::MAX)
            .unwrap();
        assert_eq!(cart.subtotal().cents(), crate::MAX_INVOICE_CENTS);
    }

    #[test]
    fn test_deduct_keeps_later_additions() {
        let mut cart = Cart::new();
        cart.add_or_update_line(line("p1", 1000, 2), 10).unwrap();
        let invoiced = cart.lines().to_vec();

        cart.add_or_update_line(line("p1", 1000, 1), 10).unwrap();
        cart.add_or_update_line(line("p2", 500, 1), 10).unwrap();

        cart.deduct(&invoiced);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of("p1"), 1);
        assert_eq!(cart.quantity_of("p2"), 1);

        let rest = cart.lines().to_vec();
        cart.deduct(&rest);
        assert!(cart.is_empty());
    }
}

