//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Invoices are shown with 2 decimal places, so every amount is kept     │
//! │  in hundredths of the currency unit ("cents") as an i64.               │
//! │                                                                         │
//! │    200,000.00  →  20_000_000 cents                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Every percentage calculation rounds half away from zero, matching how
//! amounts are displayed on the register and printed on invoices.
//!
//! ## Usage
//! ```rust
//! use tillpoint_core::money::Money;
//! use tillpoint_core::types::Percent;
//!
//! let price = Money::from_major(100_000);
//! let line = price * 2;
//! assert_eq!(line.percent_of(Percent::from_whole(10)), Money::from_major(20_000));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::Percent;

/// Number of minor units in one major currency unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Divides with rounding half away from zero.
///
/// `denom` must be positive.
pub(crate) fn div_round(numer: i128, denom: i128) -> i128 {
    let half = denom / 2;
    if numer >= 0 {
        (numer + half) / denom
    } else {
        (numer - half) / denom
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in hundredths of the currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction is allowed to go negative before a
///   result is clamped (e.g. discounts larger than the subtotal)
/// - **Single field tuple struct**: zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► InvoiceLine.unit_price ──► InvoiceLine.line_total    │
/// │                                                                         │
/// │  Σ line_total ──► subtotal ──► tax / discounts ──► total ──► change     │
/// │                                                                         │
/// │  total ──► loyalty points earned                                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (hundredths).
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    ///
    /// assert_eq!(Money::from_major(250).cents(), 25_000);
    /// ```
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * MINOR_PER_MAJOR)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MINOR_PER_MAJOR
    }

    /// Returns the fractional portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % MINOR_PER_MAJOR).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-550).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(550).clamp_non_negative().cents(), 550);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Computes `self × rate`, rounded to the nearest hundredth.
    ///
    /// ## Implementation
    /// Rates are basis points, so the exact product is
    /// `cents × bps / 10000`; i128 avoids overflow on large invoices.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    /// use tillpoint_core::types::Percent;
    ///
    /// let amount = Money::from_cents(1000);          // 10.00
    /// let tax = amount.percent_of(Percent::from_bps(825)); // 8.25%
    /// // 10.00 × 8.25% = 0.825 → 0.83
    /// assert_eq!(tax.cents(), 83);
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        let raw = self.0 as i128 * rate.bps() as i128;
        let cents = div_round(raw, Percent::SCALE as i128).clamp(i64::MIN as i128, i64::MAX as i128);
        Money(cents as i64)
    }

    /// Multiplies money by a quantity, saturating at the i64 bounds.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self × qty`, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_mul(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_major(100_000).checked_mul(1_000_000_000_000), None);
    /// ```
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns the price after a percentage reduction.
    ///
    /// A reduction of 100% or more yields zero; a zero rate leaves the
    /// price untouched.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::money::Money;
    /// use tillpoint_core::types::Percent;
    ///
    /// let price = Money::from_cents(10000);
    /// assert_eq!(price.reduced_by(Percent::from_whole(15)).cents(), 8500);
    /// assert_eq!(price.reduced_by(Percent::from_whole(100)), Money::zero());
    /// ```
    pub fn reduced_by(&self, rate: Percent) -> Money {
        if rate.is_zero() {
            return *self;
        }
        if rate >= Percent::FULL {
            return Money::zero();
        }
        let remaining = Percent::from_bps(Percent::SCALE - rate.bps());
        self.percent_of(remaining)
    }

    /// Rounds to whole currency units, half away from zero.
    ///
    /// Bank transfer requests carry whole units only.
    pub fn round_to_major(&self) -> i64 {
        div_round(self.0 as i128, MINOR_PER_MAJOR as i128) as i64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
// Operators saturate at the i64 bounds instead of panicking. Carts refuse
// amounts above `MAX_INVOICE_CENTS`, so saturation never shows on an invoice;
// use `checked_add` / `checked_mul` where overflow must be detected.

/// Plain two-decimal rendering; currency symbols are applied by the
/// register configuration.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
