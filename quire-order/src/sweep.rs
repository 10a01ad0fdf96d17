use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::compensator::{CompensationOutcome, RefundCompensator};
use crate::repository::OrderStore;

/// Decline reason recorded when the seller never answered in time.
pub const REASON_DEADLINE_EXPIRED: &str = "COMMIT_DEADLINE_EXPIRED";

/// Periodic scan for pending orders whose commit deadline has passed.
/// Multiple instances may run this concurrently; the compensator's decline
/// CAS guarantees each order is compensated at most once.
pub struct CommitmentSweep {
    store: Arc<dyn OrderStore>,
    compensator: Arc<RefundCompensator>,
    interval: Duration,
    batch_limit: i64,
}

impl CommitmentSweep {
    pub fn new(
        store: Arc<dyn OrderStore>,
        compensator: Arc<RefundCompensator>,
        interval: Duration,
        batch_limit: i64,
    ) -> Self {
        Self {
            store,
            compensator,
            interval,
            batch_limit,
        }
    }

    /// Run forever. Spawned next to the API server.
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "commitment sweep started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(0) => {}
                Ok(declined) => tracing::info!(declined, "sweep declined expired orders"),
                Err(e) => tracing::error!(error = %e, "sweep pass failed"),
            }
        }
    }

    /// One sweep pass. Returns how many orders this instance declined.
    pub async fn sweep_once(&self) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
        let due = self
            .store
            .list_pending_past_deadline(Utc::now(), self.batch_limit)
            .await?;

        let mut declined = 0;
        for order in due {
            match self
                .compensator
                .compensate(order.id, REASON_DEADLINE_EXPIRED)
                .await
            {
                Ok(CompensationOutcome::Compensated(_)) => declined += 1,
                Ok(CompensationOutcome::AlreadySettled(_)) => {
                    // Another instance or a manual decline got there first.
                    tracing::debug!(order_id = %order.id, "order already settled, skipping");
                }
                Err(e) => {
                    tracing::error!(order_id = %order.id, error = %e, "sweep compensation failed");
                }
            }
        }
        Ok(declined)
    }
}
