//! # Loyalty Tier Policy
//!
//! Maps accumulated points to a named tier and a tier to its discount.
//!
//! ## Default Tiers
//! ```text
//! ┌──────────────┬────────────┬──────────┐
//! │ Tier         │ Min points │ Discount │
//! ├──────────────┼────────────┼──────────┤
//! │ Regular      │          0 │    0%    │  ◄── base tier (fallback)
//! │ Silver       │        500 │    3%    │
//! │ Gold         │      1,000 │    7%    │
//! │ Platinum     │      2,000 │   10%    │
//! └──────────────┴────────────┴──────────┘
//! ```
//!
//! Any non-empty list works; tiers are kept sorted by `min_points` and the
//! lowest one is the base tier. A policy is loaded once per session and
//! only replaced by an explicit reload.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::Percent;
use crate::validation::{validate_name, validate_percent, ValidationResult};

/// One loyalty tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyTier {
    pub name: String,

    /// Points needed to reach this tier (inclusive).
    pub min_points: i64,

    /// Discount on the pre-discount subtotal, in basis points.
    pub discount: Percent,

    /// Perks shown to the customer.
    #[serde(default)]
    pub benefits: String,

    #[serde(default)]
    pub description: String,
}

impl LoyaltyTier {
    pub fn new(name: impl Into<String>, min_points: i64, discount: Percent) -> Self {
        LoyaltyTier {
            name: name.into(),
            min_points,
            discount,
            benefits: String::new(),
            description: String::new(),
        }
    }

    fn with_text(mut self, benefits: &str, description: &str) -> Self {
        self.benefits = benefits.to_string();
        self.description = description.to_string();
        self
    }
}

/// An ordered list of loyalty tiers.
///
/// Invariant: never empty, sorted ascending by `min_points`, names unique
/// (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPolicy {
    tiers: Vec<LoyaltyTier>,
}

impl TierPolicy {
    /// Builds a policy from tiers in any order.
    ///
    /// ## Errors
    /// - empty list
    /// - blank or duplicate tier names
    /// - negative thresholds or discounts above 100%
    pub fn new(mut tiers: Vec<LoyaltyTier>) -> ValidationResult<Self> {
        if tiers.is_empty() {
            return Err(ValidationError::Required {
                field: "loyalty tiers".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for tier in &tiers {
            validate_name("tier name", &tier.name)?;
            validate_percent("tier discount", tier.discount)?;
            if tier.min_points < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "tier minimum points".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
            if !seen.insert(tier.name.trim().to_lowercase()) {
                return Err(ValidationError::InvalidFormat {
                    field: "tier name".to_string(),
                    reason: format!("'{}' appears more than once", tier.name),
                });
            }
        }

        tiers.sort_by_key(|t| t.min_points);
        Ok(TierPolicy { tiers })
    }

    /// Tiers from lowest to highest threshold.
    pub fn tiers(&self) -> &[LoyaltyTier] {
        &self.tiers
    }

    /// The lowest tier; unknown names and low balances resolve to it.
    pub fn base(&self) -> &LoyaltyTier {
        &self.tiers[0]
    }

    /// Finds a tier by name, ignoring case and surrounding whitespace.
    pub fn find(&self, name: &str) -> Option<&LoyaltyTier> {
        let name = name.trim();
        self.tiers.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// The tier a customer with `points` belongs to.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::tier::TierPolicy;
    ///
    /// let policy = TierPolicy::default();
    /// assert_eq!(policy.tier_for(999).name, "Silver");
    /// assert_eq!(policy.tier_for(1000).name, "Gold");
    /// ```
    pub fn tier_for(&self, points: i64) -> &LoyaltyTier {
        self.tiers
            .iter()
            .rev()
            .find(|t| t.min_points <= points)
            .unwrap_or_else(|| self.base())
    }

    /// The discount for a tier name; unknown names get the base discount.
    pub fn discount_for(&self, name: &str) -> Percent {
        self.find(name).unwrap_or_else(|| self.base()).discount
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy {
            tiers: vec![
                LoyaltyTier::new("Regular", 0, Percent::zero())
                    .with_text("No special benefits", "Every registered customer"),
                LoyaltyTier::new("Silver", 500, Percent::from_whole(3))
                    .with_text("Priority customer support", "Customers with 500+ points"),
                LoyaltyTier::new("Gold", 1000, Percent::from_whole(7)).with_text(
                    "Free delivery, priority ordering",
                    "Customers with 1,000+ points",
                ),
                LoyaltyTier::new("Platinum", 2000, Percent::from_whole(10)).with_text(
                    "Personal consultant, birthday gift, VIP events",
                    "Customers with 2,000+ points",
                ),
            ],
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
