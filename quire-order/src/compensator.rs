use std::sync::Arc;

use chrono::Utc;
use quire_core::notify::{Notification, NotificationDispatcher};
use quire_core::payment::{GatewayRefundStatus, PaymentGateway, RefundRequest};
use serde_json::json;
use uuid::Uuid;

use crate::models::{OrderStatus, RefundStatus, RefundTransaction};
use crate::repository::OrderStore;

#[derive(Debug)]
pub enum CompensationOutcome {
    /// This call performed the decline and produced the refund record.
    Compensated(RefundTransaction),
    /// The order was already declined or refunded; the existing record (if
    /// the winner has persisted it yet) is returned and nothing is retried.
    AlreadySettled(Option<RefundTransaction>),
}

#[derive(Debug, thiserror::Error)]
pub enum CompensationError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),
    #[error("Order {id} is committed and can no longer be compensated")]
    Committed { id: Uuid },
    #[error("Storage error: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Compensates a declined or expired order: decline transition, gateway
/// refund, durable refund record, notifications. Idempotent per order, the
/// conditional decline at the storage boundary being the guard.
pub struct RefundCompensator {
    store: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl RefundCompensator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
        }
    }

    pub async fn compensate(
        &self,
        order_id: Uuid,
        reason: &str,
    ) -> Result<CompensationOutcome, CompensationError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or(CompensationError::NotFound(order_id))?;

        match order.status {
            OrderStatus::Committed => return Err(CompensationError::Committed { id: order_id }),
            OrderStatus::Declined | OrderStatus::Refunded => {
                let existing = self.store.refund_transaction_for_order(order_id).await?;
                return Ok(CompensationOutcome::AlreadySettled(existing));
            }
            OrderStatus::PendingCommit => {}
        }

        // The decline transition is the concurrency guard: when a manual
        // decline and the deadline sweep race, only one caller gets true
        // here and everyone else no-ops.
        let won = self
            .store
            .decline_if_pending(order_id, reason, Utc::now())
            .await?;
        if !won {
            let existing = self.store.refund_transaction_for_order(order_id).await?;
            return Ok(CompensationOutcome::AlreadySettled(existing));
        }

        let (status, refund_reference, gateway_response) = match &order.payment_reference {
            Some(payment_reference) => {
                let request = RefundRequest {
                    payment_reference: payment_reference.clone(),
                    amount_cents: order.total_cents,
                    reason: reason.to_string(),
                };
                match self.gateway.refund(&request).await {
                    Ok(response) => {
                        let status = match response.status {
                            GatewayRefundStatus::Processed => RefundStatus::Processed,
                            GatewayRefundStatus::Pending => RefundStatus::Pending,
                            GatewayRefundStatus::Failed => RefundStatus::Failed,
                        };
                        (status, Some(response.refund_reference), response.raw)
                    }
                    Err(e) => {
                        // Degrade to manual reconciliation, never silently
                        // mark the order refunded.
                        tracing::error!(
                            operation = "refund",
                            order_id = %order_id,
                            payment_reference = %payment_reference,
                            error = %e,
                            "gateway refund failed, order flagged for reconciliation"
                        );
                        (RefundStatus::Failed, None, json!({ "error": e.to_string() }))
                    }
                }
            }
            None => {
                // Nothing was captured; record the decline with no money
                // movement.
                (
                    RefundStatus::Processed,
                    None,
                    json!({ "note": "no captured payment" }),
                )
            }
        };

        let transaction = RefundTransaction {
            id: Uuid::new_v4(),
            order_id,
            payment_reference: order.payment_reference.clone(),
            refund_reference: refund_reference.clone(),
            amount_cents: order.total_cents,
            reason: reason.to_string(),
            status,
            gateway_response,
            created_at: Utc::now(),
        };
        self.store.insert_refund_transaction(&transaction).await?;
        self.store
            .record_refund_outcome(order_id, status, refund_reference.as_deref())
            .await?;

        tracing::info!(
            order_id = %order_id,
            reason,
            refund_status = status.as_str(),
            "order compensated"
        );

        self.notify(
            &order.buyer_email,
            "Your order was declined",
            &format!(
                "The seller declined your order for \"{}\". Refund status: {}.",
                order.item_title,
                status.as_str()
            ),
        )
        .await;
        self.notify(
            &order.seller_email,
            "Decline confirmed",
            &format!(
                "Your decline of the order for \"{}\" has been processed.",
                order.item_title
            ),
        )
        .await;

        Ok(CompensationOutcome::Compensated(transaction))
    }

    /// Notification failures are logged only; steps 1-4 never roll back.
    async fn notify(&self, to: &str, subject: &str, content: &str) {
        let notification = Notification {
            to: to.to_string(),
            subject: subject.to_string(),
            content: content.to_string(),
        };
        if let Err(e) = self.notifier.send(&notification).await {
            tracing::warn!(to, subject, error = %e, "notification dispatch failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderDraft};
    use crate::repository::InMemoryOrderStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use quire_settlement::sandbox::SandboxGateway;
    use quire_settlement::SplitComputation;
    use std::sync::Mutex;

    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingNotifier {
        async fn send(
            &self,
            notification: &Notification,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl NotificationDispatcher for FailingNotifier {
        async fn send(
            &self,
            _notification: &Notification,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("smtp relay unreachable".into())
        }
    }

    fn pending_order(payment_reference: &str) -> Order {
        let draft = OrderDraft {
            buyer_id: "buyer-1".to_string(),
            buyer_email: "buyer@uct.ac.za".to_string(),
            seller_id: "seller-1".to_string(),
            seller_email: "seller@wits.ac.za".to_string(),
            item_id: Uuid::new_v4(),
            item_title: "Engineering Mathematics".to_string(),
            delivery_fee_cents: 9900,
            currency: "ZAR".to_string(),
            delivery_carrier: "courier_a".to_string(),
            delivery_service: "Standard".to_string(),
            subaccount_code: "SUB_abc".to_string(),
        };
        Order::from_capture(
            &draft,
            payment_reference,
            SplitComputation::compute(49900, 0.10),
            Utc::now() + Duration::hours(48),
        )
    }

    fn compensator(
        store: Arc<InMemoryOrderStore>,
        notifier: Arc<RecordingNotifier>,
    ) -> RefundCompensator {
        RefundCompensator::new(store, Arc::new(SandboxGateway::new()), notifier)
    }

    #[tokio::test]
    async fn decline_refunds_once_and_notifies_both_parties() {
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let order = pending_order("pay_1");
        store.create_order(&order).await.unwrap();

        let outcome = compensator(store.clone(), notifier.clone())
            .compensate(order.id, "SELLER_DECLINED")
            .await
            .unwrap();

        let transaction = match outcome {
            CompensationOutcome::Compensated(t) => t,
            other => panic!("expected Compensated, got {:?}", other),
        };
        assert_eq!(transaction.status, RefundStatus::Processed);
        assert_eq!(transaction.amount_cents, order.total_cents);

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Refunded);
        assert!(stored.refund_reference.is_some());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "buyer@uct.ac.za");
        assert_eq!(sent[1].to, "seller@wits.ac.za");
    }

    #[tokio::test]
    async fn second_compensation_is_a_noop_returning_the_existing_record() {
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let order = pending_order("pay_1");
        store.create_order(&order).await.unwrap();
        let compensator = compensator(store.clone(), notifier.clone());

        let first = compensator
            .compensate(order.id, "SELLER_DECLINED")
            .await
            .unwrap();
        let first_id = match first {
            CompensationOutcome::Compensated(t) => t.id,
            other => panic!("expected Compensated, got {:?}", other),
        };

        let second = compensator
            .compensate(order.id, "COMMIT_DEADLINE_EXPIRED")
            .await
            .unwrap();
        match second {
            CompensationOutcome::AlreadySettled(Some(t)) => assert_eq!(t.id, first_id),
            other => panic!("expected AlreadySettled, got {:?}", other),
        }

        // No second refund, no extra notifications.
        assert_eq!(notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn racing_compensations_produce_exactly_one_refund() {
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let order = pending_order("pay_1");
        store.create_order(&order).await.unwrap();

        let compensator = Arc::new(compensator(store.clone(), notifier));

        // Manual decline and deadline sweep arriving at the same time.
        let manual = {
            let compensator = Arc::clone(&compensator);
            let id = order.id;
            tokio::spawn(async move { compensator.compensate(id, "SELLER_DECLINED").await })
        };
        let sweep = {
            let compensator = Arc::clone(&compensator);
            let id = order.id;
            tokio::spawn(async move { compensator.compensate(id, "COMMIT_DEADLINE_EXPIRED").await })
        };

        let results = [manual.await.unwrap(), sweep.await.unwrap()];
        let winners = results
            .iter()
            .filter(|r| matches!(r, Ok(CompensationOutcome::Compensated(_))))
            .count();
        assert_eq!(winners, 1);
        assert!(results.iter().all(|r| r.is_ok()));

        assert!(store
            .refund_transaction_for_order(order.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn failed_gateway_refund_degrades_to_manual_reconciliation() {
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        // Sandbox gateway refuses refunds for this reference.
        let order = pending_order("pay_1_norefund");
        store.create_order(&order).await.unwrap();

        let outcome = compensator(store.clone(), notifier.clone())
            .compensate(order.id, "SELLER_DECLINED")
            .await
            .unwrap();

        let transaction = match outcome {
            CompensationOutcome::Compensated(t) => t,
            other => panic!("expected Compensated, got {:?}", other),
        };
        assert_eq!(transaction.status, RefundStatus::Failed);
        assert!(transaction.refund_reference.is_none());
        assert!(transaction.gateway_response["error"].is_string());

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Declined);
        assert_eq!(stored.refund_status, Some(RefundStatus::Failed));

        // Buyer is still told, with the refund status spelled out.
        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].content.contains("FAILED"));
    }

    #[tokio::test]
    async fn notification_failures_do_not_roll_back_the_refund() {
        let store = Arc::new(InMemoryOrderStore::new());
        let order = pending_order("pay_1");
        store.create_order(&order).await.unwrap();

        let compensator = RefundCompensator::new(
            store.clone(),
            Arc::new(SandboxGateway::new()),
            Arc::new(FailingNotifier),
        );
        let outcome = compensator
            .compensate(order.id, "SELLER_DECLINED")
            .await
            .unwrap();

        // Both dispatches fail, but the decline, refund and record all stand.
        let transaction = match outcome {
            CompensationOutcome::Compensated(t) => t,
            other => panic!("expected Compensated, got {:?}", other),
        };
        assert_eq!(transaction.status, RefundStatus::Processed);

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Refunded);
        assert!(store
            .refund_transaction_for_order(order.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn committed_orders_cannot_be_compensated() {
        let store = Arc::new(InMemoryOrderStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let order = pending_order("pay_1");
        store.create_order(&order).await.unwrap();
        store.mark_committed_if_pending(order.id).await.unwrap();

        let err = compensator(store, notifier)
            .compensate(order.id, "SELLER_DECLINED")
            .await
            .unwrap_err();
        assert!(matches!(err, CompensationError::Committed { .. }));
    }
}
