pub mod commitment;
pub mod compensator;
pub mod models;
pub mod repository;
pub mod sweep;

pub use commitment::CommitmentTracker;
pub use compensator::{CompensationOutcome, RefundCompensator};
pub use models::{Order, OrderDraft, OrderStatus, RefundStatus, RefundTransaction};
pub use repository::{InMemoryOrderStore, OrderStore};
pub use sweep::CommitmentSweep;
