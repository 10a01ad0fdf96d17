use chrono::{DateTime, Utc};
use quire_core::address::Address;
use quire_delivery::DeliveryQuote;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Checkout steps in UI order. Navigation is between adjacent steps only;
/// forward progress is gated by the orchestrator's guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    Items,
    Shipping,
    Delivery,
    Payment,
}

impl CheckoutStep {
    pub fn next(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Items => Some(CheckoutStep::Shipping),
            CheckoutStep::Shipping => Some(CheckoutStep::Delivery),
            CheckoutStep::Delivery => Some(CheckoutStep::Payment),
            CheckoutStep::Payment => None,
        }
    }

    pub fn previous(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::Items => None,
            CheckoutStep::Shipping => Some(CheckoutStep::Items),
            CheckoutStep::Delivery => Some(CheckoutStep::Shipping),
            CheckoutStep::Payment => Some(CheckoutStep::Delivery),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Items => "ITEMS",
            CheckoutStep::Shipping => "SHIPPING",
            CheckoutStep::Delivery => "DELIVERY",
            CheckoutStep::Payment => "PAYMENT",
        }
    }
}

/// A listing the buyer is purchasing in this session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemSelection {
    pub item_id: Uuid,
    pub title: String,
    pub price_cents: i32,
}

/// Ephemeral checkout state for one buyer session. Never persisted; it is
/// discarded on completion or abandonment, which is why abandonment before
/// capture needs no cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub buyer_id: String,
    pub buyer_email: String,
    pub seller_id: String,
    pub seller_email: String,
    /// Seller's provisioned payment subaccount, if onboarding finished.
    pub seller_subaccount: Option<String>,
    pub pickup_address: Address,
    pub step: CheckoutStep,
    pub items: Vec<ItemSelection>,
    pub shipping_address: Option<Address>,
    pub quotes: Vec<DeliveryQuote>,
    /// Address-pair fingerprint the cached quotes were fetched for.
    pub quoted_fingerprint: Option<String>,
    pub selected_quote: Option<DeliveryQuote>,
    /// Idempotency reference for the current logical payment attempt.
    /// Reused across retryable failures, rotated on terminal ones.
    pub payment_reference: Option<String>,
    /// Guards against a second capture being issued mid-flight.
    pub processing: bool,
    pub last_error: Option<String>,
    /// Set once payment captured and the order opened; the session is done.
    pub completed_order: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn item_total_cents(&self) -> i32 {
        self.items.iter().map(|i| i.price_cents).sum()
    }

    /// Items plus the selected delivery fee, in cents.
    pub fn total_cents(&self) -> i32 {
        self.item_total_cents()
            + self
                .selected_quote
                .as_ref()
                .map(|q| q.price_cents)
                .unwrap_or(0)
    }

    /// Fingerprint of the current (pickup, shipping) pair, used to decide
    /// whether cached quotes are still valid.
    pub fn address_pair_fingerprint(&self) -> Option<String> {
        self.shipping_address
            .as_ref()
            .map(|to| format!("{}>{}", self.pickup_address.fingerprint(), to.fingerprint()))
    }
}
