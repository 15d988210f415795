//! # Voucher Selection
//!
//! Decides whether a voucher applies and picks the best one for a subtotal.
//!
//! ## Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  active vouchers                                                        │
//! │       │                                                                 │
//! │       ▼  is_active && starts_at ≤ now ≤ ends_at                         │
//! │       ▼  usage_limit == 0 || used_count < usage_limit                   │
//! │       ▼  subtotal ≥ min_invoice_amount                                  │
//! │       │                                                                 │
//! │       ▼  max by effective value (first wins on ties)                    │
//! │  Option<&Voucher>                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Selection is recomputed whenever the subtotal changes; a voucher picked
//! for a larger cart is never kept once the cart shrinks below its minimum.

use chrono::{DateTime, Utc};

use crate::money::Money;
use crate::types::Voucher;

impl Voucher {
    /// Checks whether the usage limit has been reached.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit > 0 && self.used_count >= self.usage_limit
    }

    /// Checks whether the voucher can be redeemed at `now`.
    ///
    /// Both window bounds are inclusive.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now >= self.starts_at && now <= self.ends_at && !self.is_exhausted()
    }

    /// Checks validity and the minimum invoice amount together.
    pub fn applies_to(&self, subtotal: Money, now: DateTime<Utc>) -> bool {
        self.is_valid_at(now) && subtotal >= self.min_invoice_amount()
    }

    /// The amount this voucher takes off `subtotal`.
    pub fn effective_value(&self, subtotal: Money) -> Money {
        self.discount().amount_on(subtotal)
    }
}

/// Picks the voucher worth the most on `subtotal` at `now`.
///
/// Invalid, expired, exhausted and under-minimum vouchers are skipped
/// silently. Ties keep the earliest voucher in `vouchers`.
///
/// ## Example
/// ```rust
/// use chrono::{Duration, Utc};
/// use tillpoint_core::money::Money;
/// use tillpoint_core::types::{Discount, Percent, Voucher};
/// use tillpoint_core::voucher::select_best;
///
/// let now = Utc::now();
/// let week = now + Duration::days(7);
/// let vouchers = vec![
///     Voucher::new("FLAT5K", Discount::Fixed(Money::from_major(5_000)), Money::zero(), now, week),
///     Voucher::new("TEN", Discount::Percent(Percent::from_whole(10)), Money::from_major(100_000), now, week),
/// ];
///
/// let best = select_best(&vouchers, Money::from_major(200_000), now).unwrap();
/// assert_eq!(best.code, "TEN");
///
/// let best = select_best(&vouchers, Money::from_major(40_000), now).unwrap();
/// assert_eq!(best.code, "FLAT5K");
/// ```
pub fn select_best(vouchers: &[Voucher], subtotal: Money, now: DateTime<Utc>) -> Option<&Voucher> {
    let mut best: Option<(&Voucher, Money)> = None;

    for voucher in vouchers.iter().filter(|v| v.applies_to(subtotal, now)) {
        let value = voucher.effective_value(subtotal);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((voucher, value)),
        }
    }

    best.map(|(voucher, _)| voucher)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Discount, Percent};
    use chrono::Duration;

    fn voucher(code: &str, discount: Discount, min_major: i64) -> Voucher {
        let now = Utc::now();
        Voucher::new(
            code,
            discount,
            Money::from_major(min_major),
            now - Duration::days(1),
            now + Duration::days(1),
        )
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let now = Utc::now();
        let mut v = voucher("A", Discount::Percent(Percent::from_whole(5)), 0);
        v.starts_at = now;
        v.ends_at = now;
        assert!(v.is_valid_at(now));
        assert!(!v.is_valid_at(now + Duration::seconds(1)));
        assert!(!v.is_valid_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_inactive_and_exhausted() {
        let now = Utc::now();
        let mut v = voucher("A", Discount::Percent(Percent::from_whole(5)), 0);
        v.usage_limit = 2;
        v.used_count = 1;
        assert!(v.is_valid_at(now));

        v.used_count = 2;
        assert!(v.is_exhausted());
        assert!(!v.is_valid_at(now));

        v.usage_limit = 0;
        v.used_count = 1_000;
        assert!(v.is_valid_at(now));

        v.is_active = false;
        assert!(!v.is_valid_at(now));
    }

    #[test]
    fn test_min_invoice_amount_boundary() {
        let now = Utc::now();
        let v = voucher("A", Discount::Percent(Percent::from_whole(10)), 100_000);
        assert!(v.applies_to(Money::from_major(100_000), now));
        assert!(!v.applies_to(Money::from_cents(100_000 * 100 - 1), now));
    }

    #[test]
    fn test_select_best_picks_highest_value() {
        let now = Utc::now();
        let vouchers = vec![
            voucher("SMALL", Discount::Fixed(Money::from_major(1_000)), 0),
            voucher("PCT", Discount::Percent(Percent::from_whole(10)), 0),
            voucher("BIG", Discount::Fixed(Money::from_major(30_000)), 0),
        ];
        let best = select_best(&vouchers, Money::from_major(200_000), now).unwrap();
        assert_eq!(best.code, "BIG");
    }

    #[test]
    fn test_select_best_tie_keeps_first() {
        let now = Utc::now();
        let vouchers = vec![
            voucher("FIRST", Discount::Fixed(Money::from_major(20_000)), 0),
            voucher("SECOND", Discount::Percent(Percent::from_whole(10)), 0),
        ];
        let best = select_best(&vouchers, Money::from_major(200_000), now).unwrap();
        assert_eq!(best.code, "FIRST");
    }

    #[test]
    fn test_select_best_is_idempotent() {
        let now = Utc::now();
        let vouchers = vec![
            voucher("A", Discount::Percent(Percent::from_whole(5)), 0),
            voucher("B", Discount::Percent(Percent::from_whole(7)), 0),
        ];
        let subtotal = Money::from_major(50_000);
        let first = select_best(&vouchers, subtotal, now).map(|v| v.code.clone());
        let second = select_best(&vouchers, subtotal, now).map(|v| v.code.clone());
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("B"));
    }

    #[test]
    fn test_select_best_none_when_nothing_applies() {
        let now = Utc::now();
        let mut expired = voucher("OLD", Discount::Percent(Percent::from_whole(50)), 0);
        expired.ends_at = now - Duration::hours(1);
        let vouchers = vec![expired, voucher("MIN", Discount::Percent(Percent::from_whole(10)), 1_000_000)];

        assert!(select_best(&vouchers, Money::from_major(200_000), now).is_none());
        assert!(select_best(&[], Money::from_major(200_000), now).is_none());
    }
}
