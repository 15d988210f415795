//! # Register Service
//!
//! Rings up a sale, prices it and commits it.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────┐  add_product   ┌──────────┐  checkout   ┌───────────┐    │
//! │  │  Empty   │───────────────►│  Draft   │────────────►│ Committed │    │
//! │  │  cart    │  change_qty    │  (cart)  │             │  invoice  │    │
//! │  └──────────┘  remove_line   └──────────┘             └─────┬─────┘    │
//! │       ▲                           │                         │          │
//! │       └──────── clear_cart ───────┘          delete_invoice │          │
//! │                                                             ▼          │
//! │                                                      ┌───────────┐     │
//! │                                                      │  Deleted  │     │
//! │                                                      │ (restock) │     │
//! │                                                      └───────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Checkout
//! ```text
//!   quote (tier discount + best voucher, re-selected every time)
//!     │
//!     ▼
//!   InvoiceStore::save_invoice ── Err ──► cart untouched, error returned
//!     │ Ok
//!     ▼
//!   LoyaltyStore::set_loyalty ─── Err ──► logged, sale stays committed
//!     │
//!     ▼
//!   cart cleared, InvoiceCommitted emitted
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tillpoint_core::loyalty::{apply_sale, recalculate};
use tillpoint_core::pricing::calculate;
use tillpoint_core::validation::{validate_payment_amount, validate_percent, validate_price_cents};
use tillpoint_core::voucher::select_best;
use tillpoint_core::{
    Adjustments, CoreError, CustomerLoyalty, Discount, Invoice, InvoiceLine, InvoiceTotals,
    LoyaltyTier, LoyaltyUpdate, Money, Percent, TierPolicy, UserRole,
};
use tillpoint_db::{InvoiceDraft, InvoiceWithItems};

use crate::error::{ErrorCode, RegisterError, RegisterResult};
use crate::events::{EventBus, RegisterEvent};
use crate::payment::TransferRequest;
use crate::settings::{PaymentSettings, TierPolicyStore};
use crate::state::{CartSession, CartState, TierPolicyState};
use crate::store::RegisterStore;

// =============================================================================
// Results
// =============================================================================

/// The current cart, priced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub lines: Vec<InvoiceLine>,
    pub customer_id: Option<String>,

    /// Tier the customer's discount came from.
    pub tier: Option<String>,

    /// Voucher picked for this subtotal, if any applies.
    pub voucher_code: Option<String>,

    pub totals: InvoiceTotals,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub invoice: Invoice,
    pub totals: InvoiceTotals,

    /// `None` when the loyalty update could not be stored.
    pub loyalty: Option<LoyaltyUpdate>,
}

impl CheckoutReceipt {
    /// What the customer still owes, never negative.
    pub fn amount_due(&self) -> Money {
        (self.invoice.total() - self.invoice.paid()).clamp_non_negative()
    }

    /// Bank transfer payload for the outstanding amount.
    ///
    /// ## Errors
    /// `PaymentError` when transfers are disabled or bank details are
    /// incomplete.
    pub fn transfer_request(&self, settings: &PaymentSettings) -> RegisterResult<TransferRequest> {
        TransferRequest::new(
            settings,
            self.invoice.total(),
            self.invoice.paid(),
            self.invoice.created_at,
        )
    }
}

// =============================================================================
// Register
// =============================================================================

pub struct Register {
    store: Arc<dyn RegisterStore>,
    tier_store: Arc<dyn TierPolicyStore>,
    cart: CartState,
    policy: TierPolicyState,
    events: EventBus,
    employee_id: String,

    /// Held for the whole of a checkout; a second checkout is refused.
    checkout_gate: tokio::sync::Mutex<()>,
}

impl Register {
    /// Creates a register with an empty cart and the stored tier policy.
    pub fn new(
        store: Arc<dyn RegisterStore>,
        tier_store: Arc<dyn TierPolicyStore>,
        employee_id: impl Into<String>,
    ) -> Self {
        let policy = tier_store.load_or_default();
        Register {
            store,
            tier_store,
            cart: CartState::new(),
            policy: TierPolicyState::new(policy),
            events: EventBus::new(),
            employee_id: employee_id.into(),
            checkout_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegisterEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn tier_policy(&self) -> Arc<TierPolicy> {
        self.policy.current()
    }

    /// A copy of the sale being rung up.
    pub fn session(&self) -> CartSession {
        self.cart.snapshot()
    }

    // =========================================================================
    // Cart
    // =========================================================================

    pub fn select_customer(&self, customer_id: Option<String>) {
        self.cart.with_session_mut(|s| s.customer_id = customer_id);
    }

    pub fn set_manual_discount(&self, discount: Discount) -> RegisterResult<()> {
        match discount {
            Discount::Fixed(amount) => validate_price_cents(amount.cents())?,
            Discount::Percent(rate) => validate_percent("discount", rate)?,
        }
        self.cart.with_session_mut(|s| s.manual_discount = discount);
        Ok(())
    }

    /// Adds a product at its current price (promotion applied) with the
    /// category's tax rate.
    ///
    /// ## Errors
    /// - `NotFound` for unknown products
    /// - `ValidationError` for inactive products or bad quantities
    /// - `InsufficientStock` when the cart would hold more than is on hand
    pub async fn add_product(&self, product_id: &str, quantity: i64, now: DateTime<Utc>) -> RegisterResult<()> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| RegisterError::not_found("Product", product_id))?;

        if !product.is_active {
            return Err(RegisterError::validation(format!(
                "Product {} is no longer sold",
                product.code
            )));
        }

        let tax_rate = match &product.category_id {
            Some(category_id) => self
                .store
                .category(category_id)
                .await?
                .map(|c| c.tax_rate())
                .unwrap_or_else(Percent::zero),
            None => Percent::zero(),
        };

        let line = InvoiceLine::new(
            &product.id,
            &product.name,
            product.effective_price(now),
            quantity,
            tax_rate,
        );
        self.add_line(line).await
    }

    /// Adds a line as given, e.g. with a price typed in by the cashier.
    pub async fn add_line(&self, line: InvoiceLine) -> RegisterResult<()> {
        let available = self.store.stock(&line.product_id).await?;
        debug!(product_id = %line.product_id, quantity = line.quantity, available, "Adding line");
        self.cart
            .with_session_mut(|s| s.cart.add_or_update_line(line, available))?;
        Ok(())
    }

    /// Sets a line's quantity; zero or less removes it.
    pub async fn change_quantity(&self, product_id: &str, unit_price: Money, quantity: i64) -> RegisterResult<()> {
        let available = if quantity > 0 {
            self.store.stock(product_id).await?
        } else {
            0
        };
        self.cart.with_session_mut(|s| {
            s.cart.change_quantity(product_id, unit_price, quantity, available)
        })?;
        Ok(())
    }

    pub fn remove_line(&self, product_id: &str, unit_price: Money) -> RegisterResult<InvoiceLine> {
        Ok(self
            .cart
            .with_session_mut(|s| s.cart.remove_line(product_id, unit_price))?)
    }

    /// Starts over: no lines, no customer, no manual discount.
    pub fn clear_cart(&self) {
        self.cart.with_session_mut(CartSession::reset);
    }

    // =========================================================================
    // Pricing
    // =========================================================================

    /// Prices the current cart at `now`.
    pub async fn quote(&self, now: DateTime<Utc>) -> RegisterResult<Quote> {
        let session = self.cart.snapshot();
        let (quote, _) = self.price(&session, now).await?;
        Ok(quote)
    }

    async fn price(
        &self,
        session: &CartSession,
        now: DateTime<Utc>,
    ) -> RegisterResult<(Quote, Option<CustomerLoyalty>)> {
        let policy = self.policy.current();

        let loyalty = match &session.customer_id {
            Some(id) => Some(
                self.store
                    .loyalty(id)
                    .await?
                    .ok_or_else(|| RegisterError::not_found("Customer", id))?,
            ),
            None => None,
        };
        let tier_discount = loyalty
            .as_ref()
            .map(|l| policy.discount_for(&l.tier))
            .unwrap_or_else(Percent::zero);

        let vouchers = self.store.active_vouchers(now).await?;
        let voucher = select_best(&vouchers, session.cart.subtotal(), now);

        let totals = calculate(
            session.cart.lines(),
            &Adjustments {
                manual: session.manual_discount,
                tier_discount,
                voucher,
                now,
            },
        );

        let quote = Quote {
            lines: session.cart.lines().to_vec(),
            customer_id: session.customer_id.clone(),
            tier: loyalty.as_ref().map(|l| l.tier.clone()),
            voucher_code: voucher.map(|v| v.code.clone()),
            totals,
        };
        Ok((quote, loyalty))
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Commits the current cart as an invoice paid with `paid`.
    ///
    /// ## Errors
    /// - `CartError` when the cart is empty
    /// - `ValidationError` when no customer is selected or `paid` is negative
    /// - `InsufficientStock` / `VoucherUnavailable` when stock or the voucher
    ///   ran out since the cart was built
    /// - `Persistence` (retryable) when the commit failed
    ///
    /// - `CartError` when another checkout is still running
    ///
    /// On any error nothing is stored and the cart is left as it was. Lines
    /// added while the invoice is being stored are not part of it and stay
    /// in the cart.
    pub async fn checkout(&self, paid: Money, now: DateTime<Utc>) -> RegisterResult<CheckoutReceipt> {
        validate_payment_amount(paid.cents())?;

        let _gate = self.checkout_gate.try_lock().map_err(|_| {
            RegisterError::new(ErrorCode::CartError, "A checkout is already in progress")
        })?;

        let session = self.cart.snapshot();
        if session.cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        let customer_id = session
            .customer_id
            .clone()
            .ok_or_else(|| RegisterError::validation("A customer must be selected"))?;

        let (quote, loyalty) = self.price(&session, now).await?;

        let draft = InvoiceDraft {
            customer_id: customer_id.clone(),
            employee_id: self.employee_id.clone(),
            lines: quote.lines,
            totals: quote.totals,
            settlement: quote.totals.settle(paid),
            voucher_code: quote.voucher_code,
            created_at: now,
        };

        let invoice = self.store.save_invoice(&draft).await?;

        info!(
            invoice = %invoice.invoice_number,
            customer_id = %customer_id,
            total = %invoice.total(),
            "Checkout complete"
        );

        let loyalty = match loyalty {
            Some(current) => self.record_loyalty(&current, invoice.total()).await,
            None => None,
        };

        let remaining = self.cart.with_session_mut(|s| {
            s.finish_checkout(&draft.lines);
            s.cart.len()
        });
        if remaining > 0 {
            warn!(remaining, "Lines added during checkout were kept for the next sale");
        }

        self.events.emit(RegisterEvent::InvoiceCommitted {
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            customer_id,
            total: invoice.total(),
        });

        Ok(CheckoutReceipt {
            invoice,
            totals: quote.totals,
            loyalty,
        })
    }

    /// Adds the sale's points. Failures are logged; the sale stays committed.
    async fn record_loyalty(&self, current: &CustomerLoyalty, total: Money) -> Option<LoyaltyUpdate> {
        let update = apply_sale(current, total, &self.policy.current());

        match self
            .store
            .set_loyalty(&update.customer_id, update.points, &update.tier)
            .await
        {
            Ok(true) => {
                if update.tier_changed() {
                    info!(
                        customer_id = %update.customer_id,
                        from = %update.previous_tier,
                        to = %update.tier,
                        "Customer changed tier"
                    );
                }
                self.events.emit(RegisterEvent::LoyaltyUpdated {
                    customer_id: update.customer_id.clone(),
                    points: update.points,
                    tier: update.tier.clone(),
                });
                Some(update)
            }
            Ok(false) => {
                warn!(customer_id = %update.customer_id, "Customer vanished before loyalty update");
                None
            }
            Err(e) => {
                warn!(
                    customer_id = %update.customer_id,
                    earned = update.earned,
                    error = %e,
                    "Failed to store loyalty points"
                );
                None
            }
        }
    }

    /// Deletes a committed invoice and puts its stock back.
    ///
    /// Loyalty points and voucher usage from the sale are kept.
    pub async fn delete_invoice(&self, invoice_id: &str) -> RegisterResult<InvoiceWithItems> {
        let deleted = self.store.delete_invoice(invoice_id).await?;
        info!(invoice = %deleted.invoice.invoice_number, "Invoice deleted");
        self.events.emit(RegisterEvent::InvoiceDeleted {
            invoice_id: deleted.invoice.id.clone(),
        });
        Ok(deleted)
    }

    // =========================================================================
    // Tier policy
    // =========================================================================

    /// Re-reads the stored policy and re-derives every customer's tier.
    pub async fn reload_tier_policy(&self) -> RegisterResult<usize> {
        self.policy.replace(self.tier_store.load_or_default());
        self.recalculate_tiers().await
    }

    /// Validates and stores a new tier policy, then re-derives tiers.
    ///
    /// ## Errors
    /// - `PermissionDenied` unless `role` is Admin or Manager
    /// - `ValidationError` for empty lists, duplicate names, bad thresholds
    pub async fn save_tier_policy(&self, role: UserRole, tiers: Vec<LoyaltyTier>) -> RegisterResult<usize> {
        if !role.can_manage_tier_settings() {
            return Err(RegisterError::permission_denied(format!(
                "Role {} may not change loyalty tiers",
                role
            )));
        }

        let policy = TierPolicy::new(tiers)?;
        self.tier_store.save(&policy)?;
        self.policy.replace(policy);
        info!(role = %role, "Tier policy saved");

        self.recalculate_tiers().await
    }

    /// Moves every customer to the tier their points earn under the current
    /// policy. Returns how many customers changed tier.
    pub async fn recalculate_tiers(&self) -> RegisterResult<usize> {
        let policy = self.policy.current();
        let mut updated = 0;

        for current in self.store.all_loyalty().await? {
            if let Some(next) = recalculate(&current, &policy) {
                if self
                    .store
                    .set_loyalty(&next.customer_id, next.points, &next.tier)
                    .await?
                {
                    debug!(customer_id = %next.customer_id, from = %current.tier, to = %next.tier, "Tier recalculated");
                    updated += 1;
                }
            }
        }

        info!(updated, "Customer tiers recalculated");
        self.events.emit(RegisterEvent::TierPolicyReloaded {
            customers_updated: updated,
        });
        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    use tillpoint_core::{Category, Customer, Product, Voucher};
    use tillpoint_db::{Database, DbConfig, DbError, DbResult};

    use crate::config::ConfigResult;
    use crate::error::ErrorCode;
    use crate::store::{Catalog, InvoiceStore, LoyaltyStore, VoucherStore};

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    /// Tier policy kept in memory.
    #[derive(Default)]
    struct MemoryTiers {
        saved: Mutex<Option<TierPolicy>>,
    }

    impl TierPolicyStore for MemoryTiers {
        fn load(&self) -> ConfigResult<TierPolicy> {
            Ok(self.saved.lock().unwrap().clone().unwrap_or_default())
        }

        fn save(&self, policy: &TierPolicy) -> ConfigResult<()> {
            *self.saved.lock().unwrap() = Some(policy.clone());
            Ok(())
        }
    }

    /// Delegates to SQLite, optionally failing commits or loyalty writes.
    struct Flaky {
        db: Database,
        fail_save: bool,
        fail_loyalty: bool,
    }

    #[async_trait]
    impl Catalog for Flaky {
        async fn product(&self, id: &str) -> DbResult<Option<Product>> {
            self.db.product(id).await
        }
        async fn category(&self, id: &str) -> DbResult<Option<Category>> {
            self.db.category(id).await
        }
        async fn stock(&self, product_id: &str) -> DbResult<i64> {
            self.db.stock(product_id).await
        }
    }

    #[async_trait]
    impl InvoiceStore for Flaky {
        async fn save_invoice(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
            if self.fail_save {
                return Err(DbError::TransactionFailed("database is locked".into()));
            }
            self.db.save_invoice(draft).await
        }
        async fn delete_invoice(&self, id: &str) -> DbResult<InvoiceWithItems> {
            self.db.delete_invoice(id).await
        }
    }

    #[async_trait]
    impl LoyaltyStore for Flaky {
        async fn loyalty(&self, customer_id: &str) -> DbResult<Option<CustomerLoyalty>> {
            self.db.loyalty(customer_id).await
        }
        async fn all_loyalty(&self) -> DbResult<Vec<CustomerLoyalty>> {
            self.db.all_loyalty().await
        }
        async fn set_loyalty(&self, customer_id: &str, points: i64, tier: &str) -> DbResult<bool> {
            if self.fail_loyalty {
                return Err(DbError::QueryFailed("disk I/O error".into()));
            }
            self.db.set_loyalty(customer_id, points, tier).await
        }
    }

    #[async_trait]
    impl VoucherStore for Flaky {
        async fn active_vouchers(&self, now: DateTime<Utc>) -> DbResult<Vec<Voucher>> {
            self.db.active_vouchers(now).await
        }
    }

    /// Pauses every commit until the test lets it through.
    struct Gated {
        db: Database,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    impl Gated {
        fn new(db: Database) -> Self {
            Gated {
                db,
                entered: tokio::sync::Notify::new(),
                release: tokio::sync::Notify::new(),
            }
        }
    }

    #[async_trait]
    impl Catalog for Gated {
        async fn product(&self, id: &str) -> DbResult<Option<Product>> {
            self.db.product(id).await
        }
        async fn category(&self, id: &str) -> DbResult<Option<Category>> {
            self.db.category(id).await
        }
        async fn stock(&self, product_id: &str) -> DbResult<i64> {
            self.db.stock(product_id).await
        }
    }

    #[async_trait]
    impl InvoiceStore for Gated {
        async fn save_invoice(&self, draft: &InvoiceDraft) -> DbResult<Invoice> {
            self.entered.notify_one();
            self.release.notified().await;
            self.db.save_invoice(draft).await
        }
        async fn delete_invoice(&self, id: &str) -> DbResult<InvoiceWithItems> {
            self.db.delete_invoice(id).await
        }
    }

    #[async_trait]
    impl LoyaltyStore for Gated {
        async fn loyalty(&self, customer_id: &str) -> DbResult<Option<CustomerLoyalty>> {
            self.db.loyalty(customer_id).await
        }
        async fn all_loyalty(&self) -> DbResult<Vec<CustomerLoyalty>> {
            self.db.all_loyalty().await
        }
        async fn set_loyalty(&self, customer_id: &str, points: i64, tier: &str) -> DbResult<bool> {
            self.db.set_loyalty(customer_id, points, tier).await
        }
    }

    #[async_trait]
    impl VoucherStore for Gated {
        async fn active_vouchers(&self, now: DateTime<Utc>) -> DbResult<Vec<Voucher>> {
            self.db.active_vouchers(now).await
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn register_on(store: Arc<dyn RegisterStore>) -> Register {
        Register::new(store, Arc::new(MemoryTiers::default()), "cashier-01")
    }

    /// A product at 100,000 with 10% category tax.
    async fn taxed_product(db: &Database, code: &str, stock: i64) -> Product {
        let category = db
            .categories()
            .insert(&Category {
                id: tillpoint_db::repository::new_id(),
                name: format!("Category {code}"),
                description: None,
                tax_rate_bps: 1000,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut product = Product::new(code, format!("Product {code}"), Money::from_major(100_000).cents());
        product.category_id = Some(category.id);
        product.stock_quantity = stock;
        db.products().insert(&product).await.unwrap()
    }

    async fn customer(db: &Database, points: i64, tier: &str) -> Customer {
        db.customers()
            .insert(&Customer {
                id: tillpoint_db::repository::new_id(),
                name: "Chi Le".to_string(),
                phone: Some("0912345678".to_string()),
                email: None,
                address: None,
                tier: tier.to_string(),
                points,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    async fn ten_percent_voucher(db: &Database) -> Voucher {
        let now = Utc::now();
        db.vouchers()
            .insert(&Voucher::new(
                "TEN",
                Discount::Percent(Percent::from_whole(10)),
                Money::from_major(100_000),
                now - Duration::days(1),
                now + Duration::days(1),
            ))
            .await
            .unwrap()
    }

    // -------------------------------------------------------------------------
    // Pricing
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_quote_without_discounts() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        let quote = register.quote(Utc::now()).await.unwrap();

        assert_eq!(quote.totals.subtotal, Money::from_major(200_000));
        assert_eq!(quote.totals.tax, Money::from_major(20_000));
        assert_eq!(quote.totals.total, Money::from_major(220_000));
        assert_eq!(quote.voucher_code, None);
    }

    #[tokio::test]
    async fn test_quote_with_gold_tier_and_voucher() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let gold = customer(&db, 1_200, "Gold").await;
        ten_percent_voucher(&db).await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(gold.id.clone()));
        let quote = register.quote(Utc::now()).await.unwrap();

        assert_eq!(quote.tier.as_deref(), Some("Gold"));
        assert_eq!(quote.voucher_code.as_deref(), Some("TEN"));
        assert_eq!(quote.totals.tier_discount, Money::from_major(14_000));
        assert_eq!(quote.totals.voucher_discount, Money::from_major(20_000));
        assert_eq!(quote.totals.total, Money::from_major(186_000));
    }

    #[tokio::test]
    async fn test_voucher_reselected_when_subtotal_changes() {
        let db = test_db().await;
        ten_percent_voucher(&db).await;
        let mut cheap = Product::new("PEN", "Gel pen", Money::from_major(60_000).cents());
        cheap.stock_quantity = 10;
        let cheap = db.products().insert(&cheap).await.unwrap();
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&cheap.id, 1, Utc::now()).await.unwrap();
        assert_eq!(register.quote(Utc::now()).await.unwrap().voucher_code, None);

        register.add_product(&cheap.id, 1, Utc::now()).await.unwrap();
        assert_eq!(register.quote(Utc::now()).await.unwrap().voucher_code.as_deref(), Some("TEN"));

        register
            .change_quantity(&cheap.id, cheap.price(), 1)
            .await
            .unwrap();
        assert_eq!(register.quote(Utc::now()).await.unwrap().voucher_code, None);
    }

    #[tokio::test]
    async fn test_promotion_sets_unit_price() {
        let db = test_db().await;
        let mut product = Product::new("MUG", "Ceramic mug", 200_00);
        product.promo_bps = 1500;
        product.stock_quantity = 3;
        let product = db.products().insert(&product).await.unwrap();
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 1, Utc::now()).await.unwrap();
        let session = register.session();
        assert_eq!(session.cart.lines()[0].unit_price, Money::from_cents(170_00));
        assert_eq!(session.cart.lines()[0].tax_rate, Percent::zero());
    }

    #[tokio::test]
    async fn test_manual_discount_validation() {
        let register = register_on(Arc::new(test_db().await));
        assert!(register
            .set_manual_discount(Discount::Percent(Percent::from_bps(10_001)))
            .is_err());
        assert!(register
            .set_manual_discount(Discount::Fixed(Money::from_cents(-1)))
            .is_err());
        register
            .set_manual_discount(Discount::Fixed(Money::from_major(5_000)))
            .unwrap();
        assert_eq!(
            register.session().manual_discount,
            Discount::Fixed(Money::from_major(5_000))
        );
    }

    // -------------------------------------------------------------------------
    // Cart guards
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_over_stock_leaves_cart_unchanged() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 3).await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        let before = register.session();

        let err = register.add_product(&product.id, 2, Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(register.session(), before);

        let err = register
            .change_quantity(&product.id, product.price(), 4)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(register.session(), before);
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_products() {
        let db = test_db().await;
        let mut retired = Product::new("OLD", "Retired", 1_00);
        retired.stock_quantity = 10;
        retired.is_active = false;
        let retired = db.products().insert(&retired).await.unwrap();
        let register = register_on(Arc::new(db.clone()));

        let err = register.add_product("missing", 1, Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = register.add_product(&retired.id, 1, Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 3).await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 1, Utc::now()).await.unwrap();
        let removed = register.remove_line(&product.id, product.price()).unwrap();
        assert_eq!(removed.quantity, 1);
        assert_eq!(
            register.remove_line(&product.id, product.price()).unwrap_err().code,
            ErrorCode::CartError
        );

        register.add_product(&product.id, 1, Utc::now()).await.unwrap();
        register.select_customer(Some("c-1".to_string()));
        register.clear_cart();
        assert_eq!(register.session(), CartSession::default());
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_checkout_commits_and_updates_loyalty() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let buyer = customer(&db, 999, "Silver").await;
        ten_percent_voucher(&db).await;
        let register = register_on(Arc::new(db.clone()));
        let mut events = register.subscribe();

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        let receipt = register
            .checkout(Money::from_major(200_000), Utc::now())
            .await
            .unwrap();

        // Silver 3% (6,000) + voucher 10% (20,000) off 200,000 + 20,000 tax
        assert_eq!(receipt.invoice.total(), Money::from_major(194_000));
        assert_eq!(receipt.invoice.change(), Money::from_major(6_000));
        assert_eq!(receipt.invoice.voucher_code.as_deref(), Some("TEN"));

        let loyalty = receipt.loyalty.unwrap();
        assert_eq!(loyalty.earned, 1);
        assert_eq!(loyalty.points, 1_000);
        assert_eq!(loyalty.tier, "Gold");

        let stored = db.customers().loyalty(&buyer.id).await.unwrap().unwrap();
        assert_eq!((stored.points, stored.tier.as_str()), (1_000, "Gold"));
        assert_eq!(db.products().stock(&product.id).await.unwrap(), Some(3));
        assert_eq!(db.vouchers().get_by_code("TEN").await.unwrap().unwrap().used_count, 1);
        assert!(register.session().cart.is_empty());
        assert_eq!(register.session().customer_id, None);

        assert!(matches!(events.recv().await.unwrap(), RegisterEvent::LoyaltyUpdated { points: 1_000, .. }));
        assert!(matches!(events.recv().await.unwrap(), RegisterEvent::InvoiceCommitted { .. }));
    }

    #[tokio::test]
    async fn test_checkout_requires_lines_and_customer() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let register = register_on(Arc::new(db.clone()));

        let err = register.checkout(Money::zero(), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);

        register.add_product(&product.id, 1, Utc::now()).await.unwrap();
        let err = register.checkout(Money::zero(), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = register.checkout(Money::from_cents(-1), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(register.session().cart.len(), 1);
    }

    #[tokio::test]
    async fn test_lines_added_during_checkout_stay_in_cart() {
        let db = test_db().await;
        let kettle = taxed_product(&db, "KETTLE", 5).await;
        let mug = taxed_product(&db, "MUG", 5).await;
        let buyer = customer(&db, 0, "Regular").await;
        let store = Arc::new(Gated::new(db.clone()));
        let register = Arc::new(register_on(store.clone()));

        register.add_product(&kettle.id, 1, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));

        let pending = tokio::spawn({
            let register = Arc::clone(&register);
            async move { register.checkout(Money::from_major(110_000), Utc::now()).await }
        });
        store.entered.notified().await;

        register.add_product(&mug.id, 1, Utc::now()).await.unwrap();
        assert_eq!(register.session().cart.len(), 2);

        let err = register.checkout(Money::from_major(110_000), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);

        store.release.notify_one();
        let receipt = pending.await.unwrap().unwrap();

        let stored = db.invoices().get_with_items(&receipt.invoice.id).await.unwrap().unwrap();
        let names: Vec<_> = stored.items.iter().map(|i| i.product_name.as_str()).collect();
        assert_eq!(names, vec!["Product KETTLE"]);

        let session = register.session();
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart.lines()[0].product_id, mug.id);
        assert_eq!(session.customer_id.as_deref(), Some(buyer.id.as_str()));
        assert_eq!(db.products().stock(&mug.id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_underpaid_checkout_builds_transfer_request() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let buyer = customer(&db, 0, "Regular").await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        let receipt = register
            .checkout(Money::from_major(20_000), Utc::now())
            .await
            .unwrap();
        assert_eq!(receipt.amount_due(), Money::from_major(200_000));

        let settings = PaymentSettings {
            bank_account: "0123 456 789".to_string(),
            bank_code: "VCB".to_string(),
            bank_name: "Vietcombank".to_string(),
            account_holder: "TILLPOINT STORE".to_string(),
            enable_transfer: true,
        };
        let request = receipt.transfer_request(&settings).unwrap();
        assert_eq!(request.amount, 200_000);
        assert_eq!(request.account, "0123456789");
        assert_eq!(
            request.description,
            format!("INV{}", receipt.invoice.created_at.format("%y%m%d"))
        );

        let disabled = PaymentSettings {
            enable_transfer: false,
            ..settings
        };
        let err = receipt.transfer_request(&disabled).unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_cart() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let buyer = customer(&db, 0, "Regular").await;
        let register = register_on(Arc::new(Flaky {
            db: db.clone(),
            fail_save: true,
            fail_loyalty: false,
        }));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        let before = register.session();

        let err = register.checkout(Money::from_major(220_000), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Persistence);
        assert!(err.is_retryable());
        assert_eq!(register.session(), before);
        assert_eq!(db.products().stock(&product.id).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_loyalty_failure_keeps_sale() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let buyer = customer(&db, 10, "Regular").await;
        let register = register_on(Arc::new(Flaky {
            db: db.clone(),
            fail_save: false,
            fail_loyalty: true,
        }));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        let receipt = register.checkout(Money::from_major(220_000), Utc::now()).await.unwrap();

        assert!(receipt.loyalty.is_none());
        assert!(db.invoices().get_by_id(&receipt.invoice.id).await.unwrap().is_some());
        assert_eq!(db.customers().loyalty(&buyer.id).await.unwrap().unwrap().points, 10);
        assert!(register.session().cart.is_empty());
    }

    #[tokio::test]
    async fn test_stock_taken_after_cart_built() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 2).await;
        let buyer = customer(&db, 0, "Regular").await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 2, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        db.products().adjust_stock(&product.id, -1).await.unwrap();

        let err = register.checkout(Money::zero(), Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(register.session().cart.len(), 1);
        assert!(db.invoices().list_for_customer(&buyer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_invoice_restocks() {
        let db = test_db().await;
        let product = taxed_product(&db, "KETTLE", 5).await;
        let buyer = customer(&db, 0, "Regular").await;
        let register = register_on(Arc::new(db.clone()));

        register.add_product(&product.id, 3, Utc::now()).await.unwrap();
        register.select_customer(Some(buyer.id.clone()));
        let receipt = register.checkout(Money::from_major(330_000), Utc::now()).await.unwrap();
        assert_eq!(db.products().stock(&product.id).await.unwrap(), Some(2));

        let mut events = register.subscribe();
        let deleted = register.delete_invoice(&receipt.invoice.id).await.unwrap();
        assert_eq!(deleted.items.len(), 1);
        assert_eq!(db.products().stock(&product.id).await.unwrap(), Some(5));
        assert!(matches!(events.recv().await.unwrap(), RegisterEvent::InvoiceDeleted { .. }));

        let err = register.delete_invoice(&receipt.invoice.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    // -------------------------------------------------------------------------
    // Tier policy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_cashier_cannot_save_tiers() {
        let register = register_on(Arc::new(test_db().await));
        let err = register
            .save_tier_policy(UserRole::Cashier, TierPolicy::default().tiers().to_vec())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_saving_tiers_recalculates_customers() {
        let db = test_db().await;
        let low = customer(&db, 100, "Regular").await;
        let high = customer(&db, 700, "Silver").await;
        let register = register_on(Arc::new(db.clone()));

        let updated = register
            .save_tier_policy(
                UserRole::Manager,
                vec![
                    LoyaltyTier::new("Member", 0, Percent::zero()),
                    LoyaltyTier::new("Star", 600, Percent::from_whole(5)),
                ],
            )
            .await
            .unwrap();

        assert_eq!(updated, 2);
        assert_eq!(db.customers().loyalty(&low.id).await.unwrap().unwrap().tier, "Member");
        assert_eq!(db.customers().loyalty(&high.id).await.unwrap().unwrap().tier, "Star");
        assert_eq!(register.tier_policy().discount_for("star"), Percent::from_whole(5));

        // Nothing left to move
        assert_eq!(register.recalculate_tiers().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_tiers_rejected() {
        let register = register_on(Arc::new(test_db().await));
        let err = register.save_tier_policy(UserRole::Admin, Vec::new()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(register.tier_policy().tiers().len(), 4);
    }

    #[tokio::test]
    async fn test_reload_picks_up_stored_policy() {
        let db = test_db().await;
        let tiers = Arc::new(MemoryTiers::default());
        let register = Register::new(Arc::new(db), tiers.clone(), "cashier-01");

        tiers
            .save(&TierPolicy::new(vec![LoyaltyTier::new("Only", 0, Percent::from_whole(2))]).unwrap())
            .unwrap();
        assert_eq!(register.tier_policy().tiers().len(), 4);

        register.reload_tier_policy().await.unwrap();
        assert_eq!(register.tier_policy().base().name, "Only");
    }
}
