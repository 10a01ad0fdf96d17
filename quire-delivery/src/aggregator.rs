use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use quire_core::address::{Address, Parcel};
use quire_core::courier::{CourierClient, QuoteRequest};
use serde::{Deserialize, Serialize};

use crate::rates::fallback_rates;
use crate::zone::{self, Zone};

/// Where a quote's price came from: a live courier response or the static
/// degraded-pricing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteSource {
    Live,
    Fallback,
}

/// A normalized delivery option presented to the buyer. Immutable once
/// returned; only the chosen quote's carrier and price end up on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub carrier_id: String,
    pub service_name: String,
    pub price_cents: i32,
    pub estimated_days: u32,
    pub zone: Zone,
    pub source: QuoteSource,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Incomplete {0} address: all of street, city, province, postal code and country are required")]
    IncompleteAddress(&'static str),
}

/// Fans a quote request out to every configured courier concurrently and
/// collapses the survivors into an ordered list. Courier failure is never
/// an error here; the zone-priced fallback table is the only resilience
/// mechanism, and retries belong to the individual clients.
pub struct DeliveryQuoteAggregator {
    couriers: Vec<Arc<dyn CourierClient>>,
    courier_timeout: Duration,
}

/// Carrier id attached to synthesized fallback quotes.
pub const FALLBACK_CARRIER_ID: &str = "quire_flat_rate";

impl DeliveryQuoteAggregator {
    pub fn new(couriers: Vec<Arc<dyn CourierClient>>, courier_timeout: Duration) -> Self {
        Self {
            couriers,
            courier_timeout,
        }
    }

    /// Quote a shipment. Returns at least the two fallback services; never
    /// an empty list and never an error because couriers failed.
    pub async fn get_quotes(
        &self,
        origin: &Address,
        destination: &Address,
        parcel: &Parcel,
    ) -> Result<Vec<DeliveryQuote>, DeliveryError> {
        if !origin.is_complete() {
            return Err(DeliveryError::IncompleteAddress("pickup"));
        }
        if !destination.is_complete() {
            return Err(DeliveryError::IncompleteAddress("delivery"));
        }

        let zone = zone::classify(origin, destination);
        let request = QuoteRequest {
            from: origin.clone(),
            to: destination.clone(),
            parcel: parcel.clone(),
        };

        // Failure-isolated fan-out: each courier call runs under its own
        // timeout, and one courier's failure never aborts the others.
        let calls = self.couriers.iter().map(|courier| {
            let courier = Arc::clone(courier);
            let request = request.clone();
            let timeout = self.courier_timeout;
            async move {
                let carrier_id = courier.carrier_id().to_string();
                let outcome = tokio::time::timeout(timeout, courier.quote(&request)).await;
                (carrier_id, outcome)
            }
        });

        let mut quotes = Vec::new();
        for (carrier_id, outcome) in join_all(calls).await {
            match outcome {
                Ok(Ok(services)) => {
                    for service in services {
                        quotes.push(DeliveryQuote {
                            carrier_id: carrier_id.clone(),
                            service_name: service.service_name,
                            price_cents: service.price_cents,
                            estimated_days: service.estimated_days,
                            zone,
                            source: QuoteSource::Live,
                        });
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(carrier = %carrier_id, error = %e, "courier quote failed");
                }
                Err(_) => {
                    tracing::warn!(
                        carrier = %carrier_id,
                        timeout_ms = self.courier_timeout.as_millis() as u64,
                        "courier quote timed out"
                    );
                }
            }
        }

        if quotes.is_empty() {
            tracing::info!(?zone, "no live courier quotes, using fallback rates");
            for rate in fallback_rates(zone) {
                quotes.push(DeliveryQuote {
                    carrier_id: FALLBACK_CARRIER_ID.to_string(),
                    service_name: rate.service_name.to_string(),
                    price_cents: rate.price_cents,
                    estimated_days: rate.estimated_days,
                    zone,
                    source: QuoteSource::Fallback,
                });
            }
        }

        quotes.sort_by_key(|q| q.price_cents);
        Ok(quotes)
    }
}
