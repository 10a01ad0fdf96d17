use chrono::{DateTime, Utc};
use quire_settlement::SplitComputation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order lifecycle. `PendingCommit` is the only non-terminal state that can
/// still move; `Committed`, `Declined` and `Refunded` never regress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingCommit,
    Committed,
    Declined,
    Refunded,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::PendingCommit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingCommit => "PENDING_COMMIT",
            OrderStatus::Committed => "COMMITTED",
            OrderStatus::Declined => "DECLINED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

/// Refund progress as reported by the gateway.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Processed,
    Failed,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundStatus::Pending => "PENDING",
            RefundStatus::Processed => "PROCESSED",
            RefundStatus::Failed => "FAILED",
        }
    }
}

/// The durable unit of truth for one purchase. Created atomically with a
/// successful capture; owned by the `OrderStore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: String,
    pub buyer_email: String,
    pub seller_id: String,
    pub seller_email: String,
    pub item_id: Uuid,
    pub item_title: String,
    /// Full captured amount in cents, delivery included.
    pub total_cents: i32,
    pub delivery_fee_cents: i32,
    pub currency: String,
    pub delivery_carrier: String,
    pub delivery_service: String,
    pub payment_reference: Option<String>,
    pub subaccount_code: String,
    pub platform_fee_cents: i32,
    pub seller_amount_cents: i32,
    pub status: OrderStatus,
    pub commit_deadline: DateTime<Utc>,
    pub decline_reason: Option<String>,
    pub declined_at: Option<DateTime<Utc>>,
    pub refund_status: Option<RefundStatus>,
    pub refund_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything the checkout flow knows about a purchase before capture.
/// Becomes an `Order` only once payment succeeds.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub buyer_id: String,
    pub buyer_email: String,
    pub seller_id: String,
    pub seller_email: String,
    pub item_id: Uuid,
    pub item_title: String,
    pub delivery_fee_cents: i32,
    pub currency: String,
    pub delivery_carrier: String,
    pub delivery_service: String,
    pub subaccount_code: String,
}

impl Order {
    /// Build the pending-commit order for a captured payment. The deadline
    /// is computed once here and never recomputed.
    pub fn from_capture(
        draft: &OrderDraft,
        payment_reference: &str,
        split: SplitComputation,
        commit_deadline: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id: draft.buyer_id.clone(),
            buyer_email: draft.buyer_email.clone(),
            seller_id: draft.seller_id.clone(),
            seller_email: draft.seller_email.clone(),
            item_id: draft.item_id,
            item_title: draft.item_title.clone(),
            total_cents: split.total_cents,
            delivery_fee_cents: draft.delivery_fee_cents,
            currency: draft.currency.clone(),
            delivery_carrier: draft.delivery_carrier.clone(),
            delivery_service: draft.delivery_service.clone(),
            payment_reference: Some(payment_reference.to_string()),
            subaccount_code: draft.subaccount_code.clone(),
            platform_fee_cents: split.platform_fee_cents,
            seller_amount_cents: split.seller_amount_cents,
            status: OrderStatus::PendingCommit,
            commit_deadline,
            decline_reason: None,
            declined_at: None,
            refund_status: None,
            refund_reference: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One refund attempt's durable record. At most one exists per order;
/// uniqueness on `order_id` is what prevents double refunds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundTransaction {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_reference: Option<String>,
    pub refund_reference: Option<String>,
    pub amount_cents: i32,
    pub reason: String,
    pub status: RefundStatus,
    /// Raw gateway payload (or error), kept for manual reconciliation.
    pub gateway_response: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
