//! # Validation Module
//!
//! Input validation utilities for Tillpoint.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register service (apps/register)                             │
//! │  └── Calls THIS MODULE before touching the cart or the database        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Core types                                                   │
//! │  └── Money / Percent / Discount make bad states hard to express        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (product code, voucher code)                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillpoint_core::validation::{validate_code, validate_quantity};
//!
//! assert!(validate_code("voucher code", "SPRING10").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{Discount, Percent, Product, Voucher};
use crate::MAX_CART_LINES;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a business code (product code, voucher code).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only letters, numbers, hyphens and underscores
///
/// ## Example
/// ```rust
/// use tillpoint_core::validation::validate_code;
///
/// assert!(validate_code("product code", "COF-01").is_ok());
/// assert!(validate_code("product code", "").is_err());
/// assert!(validate_code("voucher code", "10% OFF").is_err());
/// ```
pub fn validate_code(field: &str, code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, category, customer).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// Quantities are bounded only by stock; the register never caps them.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use tillpoint_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());     // Free item
/// assert!(validate_price_cents(-100).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tendered amount. Zero is allowed (unpaid bank transfer).
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a percentage field (0% to 100%).
pub fn validate_percent(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.bps() > Percent::SCALE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Percent::SCALE as i64,
        });
    }

    Ok(())
}

/// Validates a stock level.
pub fn validate_stock(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that one more line fits in the cart.
pub fn validate_cart_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines >= MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: MAX_CART_LINES as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Entity Validators
// =============================================================================

/// Validates a date window (`starts_at <= ends_at`).
pub fn validate_window(
    field: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> ValidationResult<()> {
    if starts_at > ends_at {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "start must not be after end".to_string(),
        });
    }

    Ok(())
}

/// Validates a product before it is written.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_code("product code", &product.code)?;
    validate_name("product name", &product.name)?;
    validate_price_cents(product.price_cents)?;
    validate_percent("promotion", product.promo_percent())?;
    validate_stock(product.stock_quantity)?;
    if let (Some(start), Some(end)) = (product.promo_starts_at, product.promo_ends_at) {
        validate_window("promotion window", start, end)?;
    }
    Ok(())
}

/// Validates a voucher before it is written.
///
/// ## Rules
/// - Code follows [`validate_code`]
/// - Fixed amounts are non-negative, percentages at most 100%
/// - Minimum invoice amount is non-negative
/// - Window is not inverted, usage counters are non-negative
pub fn validate_voucher(voucher: &Voucher) -> ValidationResult<()> {
    validate_code("voucher code", &voucher.code)?;

    match voucher.discount() {
        Discount::Fixed(amount) => validate_price_cents(amount.cents())?,
        Discount::Percent(_) => {
            if !(0..=Percent::SCALE as i64).contains(&voucher.discount_value) {
                return Err(ValidationError::OutOfRange {
                    field: "voucher percent".to_string(),
                    min: 0,
                    max: Percent::SCALE as i64,
                });
            }
        }
    }

    if voucher.min_invoice_cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "minimum invoice amount".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    validate_window("voucher window", voucher.starts_at, voucher.ends_at)?;

    if voucher.usage_limit < 0 || voucher.used_count < 0 {
        return Err(ValidationError::OutOfRange {
            field: "usage".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
