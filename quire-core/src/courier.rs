use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::address::{Address, Parcel};

/// Quote request sent to each configured courier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub from: Address,
    pub to: Address,
    pub parcel: Parcel,
}

/// A single service option as normalized from a courier's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierService {
    pub service_name: String,
    pub price_cents: i32,
    pub estimated_days: u32,
    pub description: Option<String>,
}

/// Capability interface for one courier provider. New carriers plug in
/// here without touching the aggregator.
#[async_trait]
pub trait CourierClient: Send + Sync {
    /// Stable identifier used in quotes and logs (e.g. "courier_guy").
    fn carrier_id(&self) -> &str;

    /// Fetch the courier's service options for a shipment. An empty list
    /// is a valid response (courier does not service the route).
    async fn quote(
        &self,
        request: &QuoteRequest,
    ) -> Result<Vec<CourierService>, Box<dyn std::error::Error + Send + Sync>>;
}
