//! # Pricing Module
//!
//! Turns cart lines plus discounts into invoice totals.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. subtotal        = Σ unit_price × quantity                           │
//! │  2. tax             = round(Σ line_total × line tax rate)   (once)      │
//! │  3. tier_discount   = round(subtotal × tier percent)                    │
//! │  4. manual_discount = round(subtotal × pct)  |  max(0, fixed)           │
//! │  5. voucher         = value on subtotal, if valid and ≥ minimum         │
//! │  6. discount        = tier + manual + voucher     (additive)            │
//! │  7. total           = max(0, subtotal + tax - discount)                 │
//! │                                                                         │
//! │  Every discount is computed off the SAME pre-discount subtotal.         │
//! │  They are summed, never compounded.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use chrono::{Duration, Utc};
//! use tillpoint_core::cart::InvoiceLine;
//! use tillpoint_core::money::Money;
//! use tillpoint_core::pricing::{calculate, Adjustments};
//! use tillpoint_core::types::{Discount, Percent, Voucher};
//!
//! let now = Utc::now();
//! let lines = vec![InvoiceLine::new("p1", "Kettle", Money::from_major(100_000), 2, Percent::from_whole(10))];
//!
//! let plain = calculate(&lines, &Adjustments::none(now));
//! assert_eq!(plain.total, Money::from_major(220_000));
//!
//! let voucher = Voucher::new(
//!     "TEN", Discount::Percent(Percent::from_whole(10)), Money::from_major(100_000),
//!     now - Duration::days(1), now + Duration::days(1),
//! );
//! let adjustments = Adjustments {
//!     tier_discount: Percent::from_whole(7),
//!     voucher: Some(&voucher),
//!     ..Adjustments::none(now)
//! };
//! let totals = calculate(&lines, &adjustments);
//! assert_eq!(totals.tier_discount, Money::from_major(14_000));
//! assert_eq!(totals.voucher_discount, Money::from_major(20_000));
//! assert_eq!(totals.total, Money::from_major(186_000));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::InvoiceLine;
use crate::money::{div_round, Money};
use crate::types::{Discount, Percent, Voucher};

// =============================================================================
// Inputs
// =============================================================================

/// Everything besides the lines that affects the total.
#[derive(Debug, Clone, Copy)]
pub struct Adjustments<'a> {
    /// Discount typed in by the cashier.
    pub manual: Discount,

    /// The customer's tier discount.
    pub tier_discount: Percent,

    /// Candidate voucher; ignored unless it applies at `now`.
    pub voucher: Option<&'a Voucher>,

    /// Reference time for voucher validity.
    pub now: DateTime<Utc>,
}

impl<'a> Adjustments<'a> {
    /// No discounts of any kind.
    pub fn none(now: DateTime<Utc>) -> Self {
        Adjustments {
            manual: Discount::NONE,
            tier_discount: Percent::zero(),
            voucher: None,
            now,
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// The computed totals of an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub tier_discount: Money,
    pub manual_discount: Money,
    pub voucher_discount: Money,

    /// `tier_discount + manual_discount + voucher_discount`.
    pub discount: Money,

    /// `max(0, subtotal + tax - discount)`.
    pub total: Money,
}

impl InvoiceTotals {
    /// Settles the invoice against a tendered amount.
    ///
    /// Underpayment is allowed and yields zero change.
    pub fn settle(&self, paid: Money) -> Settlement {
        Settlement {
            paid,
            change: (paid - self.total).clamp_non_negative(),
        }
    }

    /// What is still owed after `paid`, never negative.
    pub fn amount_due(&self, paid: Money) -> Money {
        (self.total - paid).clamp_non_negative()
    }
}

/// Payment received against an invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub paid: Money,

    /// `max(0, paid - total)`.
    pub change: Money,
}

// =============================================================================
// Calculation
// =============================================================================

/// Tax over all lines, kept exact until a single final rounding.
pub fn tax_for(lines: &[InvoiceLine]) -> Money {
    let raw: i128 = lines
        .iter()
        .map(|line| line.line_total().cents() as i128 * line.tax_rate.bps() as i128)
        .sum();
    let cents = div_round(raw, Percent::SCALE as i128).clamp(i64::MIN as i128, i64::MAX as i128);
    Money::from_cents(cents as i64)
}

/// Computes invoice totals. Pure; same inputs always give the same result.
pub fn calculate(lines: &[InvoiceLine], adjustments: &Adjustments<'_>) -> InvoiceTotals {
    let subtotal: Money = lines.iter().map(InvoiceLine::line_total).sum();
    let tax = tax_for(lines);

    let tier_discount = subtotal.percent_of(adjustments.tier_discount);
    let manual_discount = adjustments.manual.amount_on(subtotal);
    let voucher_discount = adjustments
        .voucher
        .filter(|v| v.applies_to(subtotal, adjustments.now))
        .map(|v| v.effective_value(subtotal))
        .unwrap_or_default();

    let discount = tier_discount + manual_discount + voucher_discount;
    let total = (subtotal + tax - discount).clamp_non_negative();

    InvoiceTotals {
        subtotal,
        tax,
        tier_discount,
        manual_discount,
        voucher_discount,
        discount,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn kettles() -> Vec<InvoiceLine> {
        vec![InvoiceLine::new(
            "p1",
            "Kettle",
            Money::from_major(100_000),
            2,
            Percent::from_whole(10),
        )]
    }

    fn ten_percent_voucher(now: DateTime<Utc>) -> Voucher {
        Voucher::new(
            "TEN",
            Discount::Percent(Percent::from_whole(10)),
            Money::from_major(100_000),
            now - Duration::days(1),
            now + Duration::days(1),
        )
    }

    #[test]
    fn test_no_discounts() {
        let totals = calculate(&kettles(), &Adjustments::none(Utc::now()));
        assert_eq!(totals.subtotal, Money::from_major(200_000));
        assert_eq!(totals.tax, Money::from_major(20_000));
        assert_eq!(totals.discount, Money::zero());
        assert_eq!(totals.total, Money::from_major(220_000));
    }

    #[test]
    fn test_gold_tier_with_voucher() {
        let now = Utc::now();
        let voucher = ten_percent_voucher(now);
        let totals = calculate(
            &kettles(),
            &Adjustments {
                tier_discount: Percent::from_whole(7),
                voucher: Some(&voucher),
                ..Adjustments::none(now)
            },
        );
        assert_eq!(totals.tier_discount, Money::from_major(14_000));
        assert_eq!(totals.voucher_discount, Money::from_major(20_000));
        assert_eq!(totals.discount, Money::from_major(34_000));
        assert_eq!(totals.total, Money::from_major(186_000));
    }

    #[test]
    fn test_discounts_are_additive_not_compounded() {
        let now = Utc::now();
        let voucher = ten_percent_voucher(now);
        let totals = calculate(
            &kettles(),
            &Adjustments {
                manual: Discount::Percent(Percent::from_whole(5)),
                tier_discount: Percent::from_whole(7),
                voucher: Some(&voucher),
                now,
            },
        );
        // 5% + 7% + 10% of the same 200,000 subtotal
        assert_eq!(totals.manual_discount, Money::from_major(10_000));
        assert_eq!(totals.discount, Money::from_major(44_000));
        assert_eq!(
            totals.total,
            totals.subtotal + totals.tax - totals.discount
        );
    }

    #[test]
    fn test_invalid_voucher_is_ignored() {
        let now = Utc::now();
        let mut voucher = ten_percent_voucher(now);
        voucher.is_active = false;
        let totals = calculate(
            &kettles(),
            &Adjustments {
                voucher: Some(&voucher),
                ..Adjustments::none(now)
            },
        );
        assert_eq!(totals.voucher_discount, Money::zero());

        let small = vec![InvoiceLine::new("p2", "Cup", Money::from_major(50_000), 1, Percent::zero())];
        let voucher = ten_percent_voucher(now);
        let totals = calculate(
            &small,
            &Adjustments {
                voucher: Some(&voucher),
                ..Adjustments::none(now)
            },
        );
        assert_eq!(totals.voucher_discount, Money::zero());
    }

    #[test]
    fn test_total_clamped_at_zero() {
        let totals = calculate(
            &kettles(),
            &Adjustments {
                manual: Discount::Fixed(Money::from_major(1_000_000)),
                ..Adjustments::none(Utc::now())
            },
        );
        assert_eq!(totals.total, Money::zero());
        assert_eq!(totals.discount, Money::from_major(1_000_000));
    }

    #[test]
    fn test_tax_rounds_once_across_lines() {
        // Each line alone: 0.333 → 0.33; summed exactly: 0.999 → 1.00
        let lines: Vec<_> = (0..3)
            .map(|i| InvoiceLine::new(format!("p{i}"), "Gum", Money::from_cents(333), 1, Percent::from_whole(10)))
            .collect();
        assert_eq!(tax_for(&lines).cents(), 100);
    }

    #[test]
    fn test_empty_lines() {
        let totals = calculate(&[], &Adjustments::none(Utc::now()));
        assert_eq!(totals, InvoiceTotals::default());
    }

    #[test]
    fn test_settle() {
        let totals = calculate(&kettles(), &Adjustments::none(Utc::now()));

        let exact = totals.settle(Money::from_major(220_000));
        assert_eq!(exact.change, Money::zero());

        let over = totals.settle(Money::from_major(250_000));
        assert_eq!(over.change, Money::from_major(30_000));

        let under = totals.settle(Money::from_major(100_000));
        assert_eq!(under.change, Money::zero());
        assert_eq!(totals.amount_due(Money::from_major(100_000)), Money::from_major(120_000));
    }
}
