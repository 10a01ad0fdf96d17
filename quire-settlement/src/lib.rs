pub mod gateway;
pub mod sandbox;
pub mod split;

pub use gateway::{CaptureError, CaptureOutcome, SettlementGateway};
pub use split::SplitComputation;
