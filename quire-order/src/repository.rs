use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Order, OrderStatus, RefundStatus, RefundTransaction};

/// Repository trait for order and refund persistence. The conditional
/// transitions (`*_if_pending`) return whether this caller won the update;
/// that compare-and-swap at the storage boundary is the only concurrency
/// guard the decline path needs.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_orders_for_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Transition `PENDING_COMMIT -> DECLINED` if and only if the order is
    /// still pending. Returns false when another caller already decided the
    /// order.
    async fn decline_if_pending(
        &self,
        id: Uuid,
        reason: &str,
        declined_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Transition `PENDING_COMMIT -> COMMITTED` under the same discipline.
    async fn mark_committed_if_pending(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Record the refund outcome on the order. A `PROCESSED` refund also
    /// promotes `DECLINED -> REFUNDED`; any other status leaves the order
    /// declined and flagged for reconciliation.
    async fn record_refund_outcome(
        &self,
        id: Uuid,
        status: RefundStatus,
        refund_reference: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Insert the refund record. Fails on a second insert for the same
    /// order id (unique constraint).
    async fn insert_refund_transaction(
        &self,
        transaction: &RefundTransaction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn refund_transaction_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<RefundTransaction>, Box<dyn std::error::Error + Send + Sync>>;

    /// Orders still pending whose commit deadline has passed, oldest first.
    async fn list_pending_past_deadline(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Mutex-guarded map store with the same conditional-update semantics as
/// the Postgres implementation. Used by tests and local runs.
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
    refunds: Mutex<HashMap<Uuid, RefundTransaction>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            refunds: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.id) {
            return Err(format!("duplicate order id {}", order.id).into());
        }
        orders.insert(order.id, order.clone());
        Ok(order.id)
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn list_orders_for_buyer(
        &self,
        buyer_id: &str,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn decline_if_pending(
        &self,
        id: Uuid,
        reason: &str,
        declined_at: DateTime<Utc>,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::PendingCommit => {
                order.status = OrderStatus::Declined;
                order.decline_reason = Some(reason.to_string());
                order.declined_at = Some(declined_at);
                order.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(format!("order not found: {id}").into()),
        }
    }

    async fn mark_committed_if_pending(
        &self,
        id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        match orders.get_mut(&id) {
            Some(order) if order.status == OrderStatus::PendingCommit => {
                order.status = OrderStatus::Committed;
                order.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(format!("order not found: {id}").into()),
        }
    }

    async fn record_refund_outcome(
        &self,
        id: Uuid,
        status: RefundStatus,
        refund_reference: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| format!("order not found: {id}"))?;
        order.refund_status = Some(status);
        order.refund_reference = refund_reference.map(str::to_string);
        if status == RefundStatus::Processed && order.status == OrderStatus::Declined {
            order.status = OrderStatus::Refunded;
        }
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_refund_transaction(
        &self,
        transaction: &RefundTransaction,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut refunds = self.refunds.lock().unwrap();
        if refunds.contains_key(&transaction.order_id) {
            return Err(format!(
                "refund transaction already exists for order {}",
                transaction.order_id
            )
            .into());
        }
        refunds.insert(transaction.order_id, transaction.clone());
        Ok(())
    }

    async fn refund_transaction_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<RefundTransaction>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.refunds.lock().unwrap().get(&order_id).cloned())
    }

    async fn list_pending_past_deadline(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        let mut expired: Vec<Order> = self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.status == OrderStatus::PendingCommit && o.commit_deadline < now)
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.commit_deadline.cmp(&b.commit_deadline));
        expired.truncate(limit.max(0) as usize);
        Ok(expired)
    }
}
