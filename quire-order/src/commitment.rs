use std::sync::Arc;

use chrono::{Duration, Utc};
use quire_settlement::SplitComputation;
use uuid::Uuid;

use crate::models::{Order, OrderDraft, OrderStatus};
use crate::repository::OrderStore;

#[derive(Debug, thiserror::Error)]
pub enum CommitmentError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),
    #[error("Order is no longer pending (status {status})")]
    NotPending { status: &'static str },
    #[error("Storage error: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Opens the seller's commit-or-decline window after a successful capture
/// and records the explicit commit decision.
pub struct CommitmentTracker {
    store: Arc<dyn OrderStore>,
    commit_window: Duration,
}

impl CommitmentTracker {
    pub fn new(store: Arc<dyn OrderStore>, commit_window_hours: i64) -> Self {
        Self {
            store,
            commit_window: Duration::hours(commit_window_hours),
        }
    }

    /// Persist the pending-commit order for a captured payment. The
    /// deadline is a fixed offset from capture time, computed exactly once.
    pub async fn open_commitment(
        &self,
        draft: &OrderDraft,
        payment_reference: &str,
        split: SplitComputation,
    ) -> Result<Order, CommitmentError> {
        let deadline = Utc::now() + self.commit_window;
        let order = Order::from_capture(draft, payment_reference, split, deadline);
        self.store.create_order(&order).await?;
        tracing::info!(
            order_id = %order.id,
            payment_reference,
            commit_deadline = %order.commit_deadline,
            "commitment window opened"
        );
        Ok(order)
    }

    /// Seller accepts the sale: `PENDING_COMMIT -> COMMITTED`. Fulfillment
    /// from here on is handled elsewhere.
    pub async fn commit(&self, order_id: Uuid) -> Result<Order, CommitmentError> {
        let won = self.store.mark_committed_if_pending(order_id).await?;
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CommitmentError::NotFound(order_id))?;

        if !won {
            return Err(CommitmentError::NotPending {
                status: order.status.as_str(),
            });
        }
        tracing::info!(order_id = %order_id, "seller committed to order");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryOrderStore;

    fn draft() -> OrderDraft {
        OrderDraft {
            buyer_id: "buyer-1".to_string(),
            buyer_email: "buyer@uct.ac.za".to_string(),
            seller_id: "seller-1".to_string(),
            seller_email: "seller@wits.ac.za".to_string(),
            item_id: Uuid::new_v4(),
            item_title: "Molecular Biology of the Cell".to_string(),
            delivery_fee_cents: 8500,
            currency: "ZAR".to_string(),
            delivery_carrier: "courier_a".to_string(),
            delivery_service: "Express".to_string(),
            subaccount_code: "SUB_abc".to_string(),
        }
    }

    #[tokio::test]
    async fn open_commitment_sets_pending_state_and_deadline() {
        let store = Arc::new(InMemoryOrderStore::new());
        let tracker = CommitmentTracker::new(store.clone(), 48);

        let before = Utc::now();
        let order = tracker
            .open_commitment(&draft(), "pay_1", SplitComputation::compute(48500, 0.10))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::PendingCommit);
        assert_eq!(order.payment_reference.as_deref(), Some("pay_1"));
        assert_eq!(
            order.platform_fee_cents + order.seller_amount_cents,
            order.total_cents
        );

        let window = order.commit_deadline - before;
        assert!(window >= Duration::hours(48));
        assert!(window < Duration::hours(49));

        assert!(store.get_order(order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn commit_moves_pending_order_to_committed() {
        let store = Arc::new(InMemoryOrderStore::new());
        let tracker = CommitmentTracker::new(store.clone(), 48);
        let order = tracker
            .open_commitment(&draft(), "pay_1", SplitComputation::compute(48500, 0.10))
            .await
            .unwrap();

        let committed = tracker.commit(order.id).await.unwrap();
        assert_eq!(committed.status, OrderStatus::Committed);

        // A second commit observes the terminal state.
        let err = tracker.commit(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            CommitmentError::NotPending {
                status: "COMMITTED"
            }
        ));
    }
}
