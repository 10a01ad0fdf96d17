use async_trait::async_trait;
use quire_core::courier::{CourierClient, CourierService, QuoteRequest};

use crate::rates::fallback_rates;
use crate::zone;

/// In-process courier used for local runs and sandbox environments. Prices
/// come from the zone table plus a per-carrier margin so two instances
/// produce distinguishable quotes. Live carrier integrations implement
/// `CourierClient` against their own APIs.
pub struct SandboxCourier {
    carrier_id: String,
    margin_cents: i32,
}

impl SandboxCourier {
    pub fn new(carrier_id: impl Into<String>, margin_cents: i32) -> Self {
        Self {
            carrier_id: carrier_id.into(),
            margin_cents,
        }
    }
}

#[async_trait]
impl CourierClient for SandboxCourier {
    fn carrier_id(&self) -> &str {
        &self.carrier_id
    }

    async fn quote(
        &self,
        request: &QuoteRequest,
    ) -> Result<Vec<CourierService>, Box<dyn std::error::Error + Send + Sync>> {
        let zone = zone::classify(&request.from, &request.to);
        let services = fallback_rates(zone)
            .into_iter()
            .map(|rate| CourierService {
                service_name: rate.service_name.to_string(),
                price_cents: rate.price_cents + self.margin_cents,
                estimated_days: rate.estimated_days,
                description: Some(format!("{} ({})", rate.service_name, self.carrier_id)),
            })
            .collect();
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::address::{Address, Parcel};

    #[tokio::test]
    async fn sandbox_courier_applies_margin() {
        let address = Address {
            street: "1 Test Street".to_string(),
            suburb: None,
            city: "Durban".to_string(),
            province: "KwaZulu-Natal".to_string(),
            postal_code: "4001".to_string(),
            country: "ZA".to_string(),
        };
        let courier = SandboxCourier::new("sandbox_a", 700);
        let services = courier
            .quote(&QuoteRequest {
                from: address.clone(),
                to: address,
                parcel: Parcel::standard_textbook(),
            })
            .await
            .unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].price_cents, 6500 + 700);
    }
}
