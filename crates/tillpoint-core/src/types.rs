//! # Domain Types
//!
//! Core domain types used throughout Tillpoint.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │   │    Product      │   │    Customer     │       │
//! │  │  ─────────────  │◄──│  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  code           │   │  name           │       │
//! │  │  tax_rate_bps   │   │  price_cents    │   │  tier / points  │       │
//! │  └─────────────────┘   │  promo window   │   └─────────────────┘       │
//! │                        │  supplier_id ───┼──► Supplier (contacts)      │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Voucher      │   │    Invoice      │   │  InvoiceItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (unique)  │   │  totals (cents) │──►│  unit price     │       │
//! │  │  Discount       │   │  paid / change  │   │  quantity       │       │
//! │  │  window / usage │   │  voucher_code   │   │  tax snapshot   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Value types: Percent (bps), Discount, DiscountKind, UserRole          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Shape
//! Entity structs mirror their table rows (`*_cents`, `*_bps` integer
//! columns) and expose typed accessors (`price()`, `tax_rate()`, ...).
//! With the `sqlx` feature they derive `FromRow` directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 700 bps = 7% (Gold tier), 1000 bps = 10% (typical category tax)
///
/// Used for tax rates, tier discounts, voucher percentages and promotions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(u32);

impl Percent {
    /// Basis points in 100%.
    pub const SCALE: u32 = 10_000;

    /// 100%.
    pub const FULL: Percent = Percent(Self::SCALE);

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a whole number (7 → 7%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
        }
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category. Its tax rate applies to every product in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Tax rate in basis points (1000 = 10%).
    pub tax_rate_bps: u32,

    /// When the category was created.
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> Percent {
        Percent::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// A company the store buys stock from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub name: String,

    /// Person to call about orders.
    pub contact_name: Option<String>,

    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// Creates a supplier with a fresh id and no contact details.
    pub fn new(name: impl Into<String>) -> Self {
        Supplier {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            contact_name: None,
            phone: None,
            email: None,
            address: None,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Product code printed on shelf labels - business identifier.
    pub code: String,

    /// Display name shown to cashier and on the invoice.
    pub name: String,

    /// Category (determines the tax rate).
    pub category_id: Option<String>,

    /// Who the product is bought from.
    pub supplier_id: Option<String>,

    /// List price in cents.
    pub price_cents: i64,

    /// Promotional reduction in basis points (0 = no promotion).
    pub promo_bps: u32,

    /// Promotion start; `None` means "already started".
    pub promo_starts_at: Option<DateTime<Utc>>,

    /// Promotion end; `None` means "never ends".
    pub promo_ends_at: Option<DateTime<Utc>>,

    /// Units on hand.
    pub stock_quantity: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the list price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the promotional reduction.
    #[inline]
    pub fn promo_percent(&self) -> Percent {
        Percent::from_bps(self.promo_bps)
    }

    /// Checks whether the promotion applies at `now`.
    ///
    /// A promotion needs a positive rate; missing window bounds are open.
    pub fn promo_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.promo_bps == 0 {
            return false;
        }
        let started = self.promo_starts_at.map_or(true, |start| now >= start);
        let not_ended = self.promo_ends_at.map_or(true, |end| now <= end);
        started && not_ended
    }

    /// Returns the unit price a cashier should charge at `now`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use tillpoint_core::types::Product;
    ///
    /// let mut product = Product::new("COF-01", "Coffee beans", 200_00);
    /// product.promo_bps = 1500; // 15% off, open-ended
    /// assert_eq!(product.effective_price(Utc::now()).cents(), 170_00);
    /// ```
    pub fn effective_price(&self, now: DateTime<Utc>) -> Money {
        if self.promo_active_at(now) {
            self.price().reduced_by(self.promo_percent())
        } else {
            self.price()
        }
    }

    /// Checks if `quantity` units can be sold from current stock.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }

    /// Creates an active product with a fresh id, no category and no stock.
    pub fn new(code: impl Into<String>, name: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.into(),
            name: name.into(),
            category_id: None,
            supplier_id: None,
            price_cents,
            promo_bps: 0,
            promo_starts_at: None,
            promo_ends_at: None,
            stock_quantity: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Full name.
    pub name: String,

    /// Phone number.
    pub phone: Option<String>,

    /// Email address.
    pub email: Option<String>,

    /// Postal address.
    pub address: Option<String>,

    /// Loyalty tier name, derived from `points` by the tier policy.
    pub tier: String,

    /// Accumulated loyalty points.
    pub points: i64,

    /// When the customer was registered.
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Returns the loyalty snapshot for this customer.
    pub fn loyalty(&self) -> CustomerLoyalty {
        CustomerLoyalty {
            customer_id: self.id.clone(),
            points: self.points,
            tier: self.tier.clone(),
        }
    }
}

/// The loyalty state of a customer.
///
/// Mutated only after a completed sale or a tier recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CustomerLoyalty {
    pub customer_id: String,
    pub points: i64,
    pub tier: String,
}

// =============================================================================
// Discounts
// =============================================================================

/// Storage discriminant for a [`Discount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Fixed,
    Percent,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Fixed => write!(f, "fixed"),
            DiscountKind::Percent => write!(f, "percent"),
        }
    }
}

impl FromStr for DiscountKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "amount" => Ok(DiscountKind::Fixed),
            "percent" | "percentage" | "%" => Ok(DiscountKind::Percent),
            _ => Err(ValidationError::NotAllowed {
                field: "discount kind".to_string(),
                allowed: vec!["fixed".to_string(), "percent".to_string()],
            }),
        }
    }
}

/// A discount, either a fixed amount or a percentage of the subtotal.
///
/// ## Example
/// ```rust
/// use tillpoint_core::money::Money;
/// use tillpoint_core::types::{Discount, Percent};
///
/// let subtotal = Money::from_major(200_000);
/// assert_eq!(Discount::Percent(Percent::from_whole(10)).amount_on(subtotal), Money::from_major(20_000));
/// assert_eq!(Discount::Fixed(Money::from_major(5_000)).amount_on(subtotal), Money::from_major(5_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Discount {
    Fixed(Money),
    Percent(Percent),
}

impl Discount {
    /// No discount.
    pub const NONE: Discount = Discount::Fixed(Money::zero());

    /// Returns the amount taken off `subtotal`.
    ///
    /// Fixed amounts are clamped to be non-negative; percentages are
    /// rounded to the nearest hundredth.
    pub fn amount_on(&self, subtotal: Money) -> Money {
        match self {
            Discount::Fixed(amount) => amount.clamp_non_negative(),
            Discount::Percent(rate) => subtotal.percent_of(*rate),
        }
    }

    /// Returns the storage discriminant.
    pub fn kind(&self) -> DiscountKind {
        match self {
            Discount::Fixed(_) => DiscountKind::Fixed,
            Discount::Percent(_) => DiscountKind::Percent,
        }
    }

    /// Returns the raw stored value (cents or basis points).
    pub fn raw_value(&self) -> i64 {
        match self {
            Discount::Fixed(amount) => amount.cents(),
            Discount::Percent(rate) => rate.bps() as i64,
        }
    }

    /// Rebuilds a discount from its stored columns.
    ///
    /// Percent values outside `0..=10000` bps are clamped.
    pub fn from_parts(kind: DiscountKind, value: i64) -> Self {
        match kind {
            DiscountKind::Fixed => Discount::Fixed(Money::from_cents(value)),
            DiscountKind::Percent => {
                Discount::Percent(Percent::from_bps(value.clamp(0, Percent::SCALE as i64) as u32))
            }
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::NONE
    }
}

// =============================================================================
// Voucher
// =============================================================================

/// A discount voucher.
///
/// Validity rules live in [`crate::voucher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Voucher {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Code typed at the register (unique).
    pub code: String,

    /// Fixed or percent.
    pub discount_kind: DiscountKind,

    /// Cents for fixed vouchers, basis points for percent vouchers.
    pub discount_value: i64,

    /// Minimum subtotal (cents) before the voucher applies.
    pub min_invoice_cents: i64,

    /// First instant the voucher is valid.
    pub starts_at: DateTime<Utc>,

    /// Last instant the voucher is valid.
    pub ends_at: DateTime<Utc>,

    /// Maximum number of uses (0 = unlimited).
    pub usage_limit: i64,

    /// How many times the voucher has been used.
    pub used_count: i64,

    /// Whether the voucher can be used at all.
    pub is_active: bool,

    /// When the voucher was created.
    pub created_at: DateTime<Utc>,
}

impl Voucher {
    /// Returns the typed discount.
    #[inline]
    pub fn discount(&self) -> Discount {
        Discount::from_parts(self.discount_kind, self.discount_value)
    }

    /// Returns the minimum invoice amount.
    #[inline]
    pub fn min_invoice_amount(&self) -> Money {
        Money::from_cents(self.min_invoice_cents)
    }

    /// Creates an active, unlimited voucher with a fresh id.
    pub fn new(
        code: impl Into<String>,
        discount: Discount,
        min_invoice_amount: Money,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Voucher {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.into(),
            discount_kind: discount.kind(),
            discount_value: discount.raw_value(),
            min_invoice_cents: min_invoice_amount.cents(),
            starts_at,
            ends_at,
            usage_limit: 0,
            used_count: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed invoice header.
///
/// Committed invoices are immutable; they can only be deleted (which
/// restores stock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable number, e.g. "INV-20260314-0007".
    pub invoice_number: String,

    /// Customer the invoice was issued to.
    pub customer_id: String,

    /// Employee who rang up the sale.
    pub employee_id: String,

    pub subtotal_cents: i64,
    pub tax_cents: i64,

    /// Sum of tier, manual and voucher discounts.
    pub discount_cents: i64,

    pub total_cents: i64,
    pub paid_cents: i64,
    pub change_cents: i64,

    /// Voucher applied, if any.
    pub voucher_code: Option<String>,

    /// When the invoice was committed.
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

/// A line item on a committed invoice.
///
/// Name, price and tax rate are snapshotted at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub tax_rate_bps: u32,
    pub line_total_cents: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// User Role
// =============================================================================

/// The role of the employee operating the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Cashier,
}

impl UserRole {
    /// Parses a role, falling back to the least privileged role.
    ///
    /// ## Example
    /// ```rust
    /// use tillpoint_core::types::UserRole;
    ///
    /// assert_eq!(UserRole::parse_lenient(" MANAGER "), UserRole::Manager);
    /// assert_eq!(UserRole::parse_lenient("owner"), UserRole::Cashier);
    /// ```
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(UserRole::Cashier)
    }

    /// Whether this role may edit and save the loyalty tier settings.
    #[inline]
    pub fn can_manage_tier_settings(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    /// Returns the role name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Manager => "manager",
            UserRole::Cashier => "cashier",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "manager" => Ok(UserRole::Manager),
            "cashier" => Ok(UserRole::Cashier),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![
                    "admin".to_string(),
                    "manager".to_string(),
                    "cashier".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
