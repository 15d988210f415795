//! # tillpoint-core: Pure Business Logic for Tillpoint
//!
//! This crate is the **heart** of Tillpoint: the invoice pricing, voucher
//! and loyalty engine, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillpoint Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Register service (apps/register)               │   │
//! │  │    add_product, quote, checkout, delete_invoice, reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ tillpoint-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   cart lines + customer loyalty                                 │   │
//! │  │        │                                                        │   │
//! │  │        ▼                                                        │   │
//! │  │   ┌────────┐    ┌──────────┐    ┌─────────┐    ┌──────────┐    │   │
//! │  │   │  cart  │──► │ pricing  │──► │ totals  │──► │ loyalty  │    │   │
//! │  │   └────────┘    └────┬─────┘    └─────────┘    └──────────┘    │   │
//! │  │                 ┌────┴─────┐                                    │   │
//! │  │                 │ voucher  │ tier                               │   │
//! │  │                 └──────────┘                                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tillpoint-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Voucher, Invoice, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`cart`] - Draft invoice lines with merging and stock guard
//! - [`pricing`] - Tax, discounts and totals
//! - [`voucher`] - Voucher validity and best-voucher selection
//! - [`tier`] - Loyalty tier policy
//! - [`loyalty`] - Points earned per sale
//! - [`pagination`] - Paged list views
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; "now" is always a parameter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use tillpoint_core::cart::{Cart, InvoiceLine};
//! use tillpoint_core::loyalty::points_earned;
//! use tillpoint_core::pricing::{calculate, Adjustments};
//! use tillpoint_core::{Money, Percent};
//!
//! let mut cart = Cart::new();
//! let line = InvoiceLine::new("p1", "Kettle", Money::from_major(100_000), 2, Percent::from_whole(10));
//! cart.add_or_update_line(line, 5).unwrap();
//!
//! let totals = calculate(cart.lines(), &Adjustments::none(Utc::now()));
//! assert_eq!(totals.total, Money::from_major(220_000));
//! assert_eq!(points_earned(totals.total), 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod loyalty;
pub mod money;
pub mod pagination;
pub mod pricing;
pub mod tier;
pub mod types;
pub mod validation;
pub mod voucher;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tillpoint_core::Money` instead of
// `use tillpoint_core::money::Money`

pub use cart::{Cart, InvoiceLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use loyalty::LoyaltyUpdate;
pub use money::Money;
pub use pricing::{Adjustments, InvoiceTotals, Settlement};
pub use tier::{LoyaltyTier, TierPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and keeps printed invoices to a sane length.
pub const MAX_CART_LINES: usize = 100;

/// Largest subtotal a cart may reach, in cents (10 trillion currency units).
///
/// Keeps subtotal plus tax (at most 100%) far inside i64, so totals are
/// always exact.
pub const MAX_INVOICE_CENTS: i64 = 1_000_000_000_000_000;
