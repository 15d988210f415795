//! # Register Events
//!
//! Screens that show derived data (dashboard, customer list) subscribe here
//! instead of being poked directly after each sale.
//!
//! ```text
//! Register::checkout ──► EventBus::emit(InvoiceCommitted) ──┬──► dashboard
//!                                                           └──► customer list
//! ```
//!
//! Delivery is best effort: with no subscribers events are dropped, and a
//! subscriber that falls behind sees `RecvError::Lagged` and should refresh.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use tillpoint_core::Money;

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Something that changed persisted register data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegisterEvent {
    InvoiceCommitted {
        invoice_id: String,
        invoice_number: String,
        customer_id: String,
        total: Money,
    },
    InvoiceDeleted {
        invoice_id: String,
    },
    LoyaltyUpdated {
        customer_id: String,
        points: i64,
        tier: String,
    },
    /// A new tier policy is in effect; `customers_updated` tiers changed.
    TierPolicyReloaded {
        customers_updated: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RegisterEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        EventBus { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegisterEvent> {
        self.tx.subscribe()
    }

    /// Publishes to current subscribers; a no-op when there are none.
    pub fn emit(&self, event: RegisterEvent) {
        debug!(?event, "Register event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
