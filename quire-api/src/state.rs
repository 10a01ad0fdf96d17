use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use quire_checkout::{CheckoutOrchestrator, CheckoutSession};
use quire_order::repository::OrderStore;
use quire_order::{CommitmentTracker, RefundCompensator};
use uuid::Uuid;

/// In-process registry of live checkout sessions. Sessions are ephemeral
/// by design; a restart simply abandons them, which has no side effects
/// before capture. Each session gets its own async lock so one buyer's
/// in-flight capture never blocks another's.
pub struct SessionMap {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<CheckoutSession>>>>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, session: CheckoutSession) -> Uuid {
        let id = session.id;
        self.inner
            .lock()
            .unwrap()
            .insert(id, Arc::new(tokio::sync::Mutex::new(session)));
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<tokio::sync::Mutex<CheckoutSession>>> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) {
        self.inner.lock().unwrap().remove(&id);
    }
}

impl Default for SessionMap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CheckoutOrchestrator>,
    pub sessions: Arc<SessionMap>,
    pub order_store: Arc<dyn OrderStore>,
    pub tracker: Arc<CommitmentTracker>,
    pub compensator: Arc<RefundCompensator>,
}
