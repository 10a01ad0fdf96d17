pub mod orchestrator;
pub mod session;

pub use orchestrator::{CheckoutError, CheckoutOrchestrator};
pub use session::{CheckoutSession, CheckoutStep, ItemSelection};
