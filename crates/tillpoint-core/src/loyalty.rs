//! # Loyalty Updater
//!
//! Computes points earned on a sale and the tier they lead to.
//!
//! ## Earning Rule
//! ```text
//! earned     = floor(total / 100,000)     total AFTER every discount
//! new_points = points + earned
//! new_tier   = policy.tier_for(new_points)
//! ```
//!
//! The result is a value; persisting it is the caller's job and a failure
//! there never undoes the sale.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::tier::TierPolicy;
use crate::types::CustomerLoyalty;

/// Currency spent per loyalty point.
pub const SPEND_PER_POINT: Money = Money::from_major(100_000);

/// Points earned for an invoice total. Negative totals earn nothing.
///
/// ## Example
/// ```rust
/// use tillpoint_core::loyalty::points_earned;
/// use tillpoint_core::money::Money;
///
/// assert_eq!(points_earned(Money::from_major(250_000)), 2);
/// assert_eq!(points_earned(Money::from_major(99_999)), 0);
/// ```
pub fn points_earned(total: Money) -> i64 {
    total.clamp_non_negative().cents() / SPEND_PER_POINT.cents()
}

/// The outcome of applying a sale to a customer's loyalty state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyUpdate {
    pub customer_id: String,
    pub previous_points: i64,
    pub earned: i64,
    pub points: i64,
    pub previous_tier: String,
    pub tier: String,
}

impl LoyaltyUpdate {
    pub fn tier_changed(&self) -> bool {
        self.previous_tier != self.tier
    }

    /// The new state to persist.
    pub fn loyalty(&self) -> CustomerLoyalty {
        CustomerLoyalty {
            customer_id: self.customer_id.clone(),
            points: self.points,
            tier: self.tier.clone(),
        }
    }
}

/// Applies a committed sale's total to `current`.
pub fn apply_sale(current: &CustomerLoyalty, total: Money, policy: &TierPolicy) -> LoyaltyUpdate {
    let earned = points_earned(total);
    let points = current.points.saturating_add(earned);
    LoyaltyUpdate {
        customer_id: current.customer_id.clone(),
        previous_points: current.points,
        earned,
        points,
        previous_tier: current.tier.clone(),
        tier: policy.tier_for(points).name.clone(),
    }
}

/// Re-derives the tier from points under `policy`.
///
/// Returns `None` when the stored tier is already correct.
pub fn recalculate(current: &CustomerLoyalty, policy: &TierPolicy) -> Option<CustomerLoyalty> {
    let tier = &policy.tier_for(current.points).name;
    if *tier == current.tier {
        return None;
    }
    Some(CustomerLoyalty {
        customer_id: current.customer_id.clone(),
        points: current.points,
        tier: tier.clone(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn loyalty(points: i64, tier: &str) -> CustomerLoyalty {
        CustomerLoyalty {
            customer_id: "c1".to_string(),
            points,
            tier: tier.to_string(),
        }
    }

    #[test]
    fn test_points_earned_floors() {
        assert_eq!(points_earned(Money::from_major(250_000)), 2);
        assert_eq!(points_earned(Money::from_cents(10_000_000 - 1)), 0);
        assert_eq!(points_earned(Money::from_major(100_000)), 1);
        assert_eq!(points_earned(Money::from_cents(-500)), 0);
    }

    #[test]
    fn test_apply_sale_promotes_at_threshold() {
        let policy = TierPolicy::default();
        let update = apply_sale(&loyalty(498, "Regular"), Money::from_major(250_000), &policy);

        assert_eq!(update.earned, 2);
        assert_eq!(update.points, 500);
        assert_eq!(update.tier, "Silver");
        assert!(update.tier_changed());
        assert_eq!(update.loyalty(), loyalty(500, "Silver"));
    }

    #[test]
    fn test_apply_sale_without_points() {
        let policy = TierPolicy::default();
        let update = apply_sale(&loyalty(1200, "Gold"), Money::from_major(5_000), &policy);
        assert_eq!(update.earned, 0);
        assert!(!update.tier_changed());
    }

    #[test]
    fn test_recalculate_only_reports_changes() {
        let policy = TierPolicy::default();
        assert!(recalculate(&loyalty(1200, "Gold"), &policy).is_none());

        let fixed = recalculate(&loyalty(1200, "Regular"), &policy).unwrap();
        assert_eq!(fixed.tier, "Gold");
        assert_eq!(fixed.points, 1200);
    }
}
