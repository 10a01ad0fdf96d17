pub mod aggregator;
pub mod couriers;
pub mod rates;
pub mod zone;

pub use aggregator::{DeliveryQuote, DeliveryQuoteAggregator, QuoteSource};
pub use zone::Zone;
