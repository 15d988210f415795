//! # Register State
//!
//! Shared in-memory state held by the register.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐        ┌──────────────────────────────┐  │
//! │  │       CartState          │        │      TierPolicyState         │  │
//! │  │                          │        │                              │  │
//! │  │  Arc<Mutex<CartSession>> │        │  RwLock<Arc<TierPolicy>>     │  │
//! │  │  • cart lines            │        │  • read on every quote       │  │
//! │  │  • selected customer     │        │  • swapped on explicit       │  │
//! │  │  • manual discount       │        │    reload / save             │  │
//! │  └──────────────────────────┘        └──────────────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Locks are never held across an `.await`                             │
//! │  • A poisoned lock is recovered: the data is plain values and every    │
//! │    mutation validates before it writes                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tillpoint_core::{Cart, Discount, InvoiceLine, TierPolicy};

/// The sale being rung up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartSession {
    pub cart: Cart,

    /// Customer the invoice will be billed to.
    pub customer_id: Option<String>,

    /// Discount typed in by the cashier.
    pub manual_discount: Discount,
}

impl CartSession {
    /// Empties the cart and forgets the customer and manual discount.
    pub fn reset(&mut self) {
        *self = CartSession::default();
    }

    /// Removes invoiced lines after a checkout.
    ///
    /// Lines added while the invoice was being stored are kept, along with
    /// the customer and manual discount they were rung up with. Otherwise
    /// the session starts over.
    pub fn finish_checkout(&mut self, invoiced: &[InvoiceLine]) {
        self.cart.deduct(invoiced);
        if self.cart.is_empty() {
            self.reset();
        }
    }
}

/// Cart state shared between callers.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    session: Arc<Mutex<CartSession>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a function with read access to the session.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let lines = cart_state.with_session(|s| s.cart.lines().to_vec());
    /// ```
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&CartSession) -> R,
    {
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        f(&session)
    }

    /// Executes a function with write access to the session.
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut CartSession) -> R,
    {
        let mut session = self.session.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut session)
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> CartSession {
        self.with_session(CartSession::clone)
    }
}

/// The loyalty tier policy in effect for this session.
#[derive(Debug)]
pub struct TierPolicyState {
    policy: RwLock<Arc<TierPolicy>>,
}

impl TierPolicyState {
    pub fn new(policy: TierPolicy) -> Self {
        TierPolicyState {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// The current policy. Holders keep a consistent view across a reload.
    pub fn current(&self) -> Arc<TierPolicy> {
        Arc::clone(&self.policy.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn replace(&self, policy: TierPolicy) {
        *self.policy.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(policy);
    }
}

impl Default for TierPolicyState {
    fn default() -> Self {
        Self::new(TierPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillpoint_core::{LoyaltyTier, Money, Percent};

    #[test]
    fn test_session_mutation_and_reset() {
        let state = CartState::new();
        state
            .with_session_mut(|s| {
                s.customer_id = Some("c-1".to_string());
                s.manual_discount = Discount::Percent(Percent::from_whole(5));
                s.cart.add_or_update_line(
                    InvoiceLine::new("p-1", "Tea", Money::from_major(10), 2, Percent::zero()),
                    5,
                )
            })
            .unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.cart.len(), 1);
        assert_eq!(snapshot.customer_id.as_deref(), Some("c-1"));

        state.with_session_mut(CartSession::reset);
        assert!(state.with_session(|s| s.cart.is_empty() && s.customer_id.is_none()));
    }

    #[test]
    fn test_finish_checkout_keeps_later_lines() {
        let kettle = InvoiceLine::new("p-1", "Kettle", Money::from_major(100), 1, Percent::zero());
        let mug = InvoiceLine::new("p-2", "Mug", Money::from_major(20), 1, Percent::zero());

        let mut session = CartSession {
            customer_id: Some("c-1".to_string()),
            ..CartSession::default()
        };
        session.cart.add_or_update_line(kettle.clone(), 5).unwrap();
        let invoiced = session.cart.lines().to_vec();
        session.cart.add_or_update_line(mug, 5).unwrap();

        session.finish_checkout(&invoiced);
        assert_eq!(session.cart.len(), 1);
        assert_eq!(session.cart.lines()[0].product_id, "p-2");
        assert_eq!(session.customer_id.as_deref(), Some("c-1"));

        let rest = session.cart.lines().to_vec();
        session.finish_checkout(&rest);
        assert_eq!(session, CartSession::default());
    }

    #[test]
    fn test_poisoned_cart_is_recovered() {
        let state = CartState::new();
        let clone = state.clone();
        let _ = std::thread::spawn(move || {
            clone.with_session_mut(|_| panic!("boom"));
        })
        .join();

        assert!(state.with_session(|s| s.cart.is_empty()));
    }

    #[test]
    fn test_policy_replace_keeps_old_snapshot() {
        let state = TierPolicyState::default();
        let before = state.current();

        state.replace(TierPolicy::new(vec![LoyaltyTier::new("Member", 0, Percent::zero())]).unwrap());

        assert_eq!(before.tiers().len(), 4);
        assert_eq!(state.current().tiers().len(), 1);
    }
}
