use crate::zone::Zone;

/// One row of the static fallback price table.
#[derive(Debug, Clone, Copy)]
pub struct FallbackRate {
    pub service_name: &'static str,
    pub price_cents: i32,
    pub estimated_days: u32,
}

/// Zone-indexed degraded pricing, used only when no live courier quote
/// survives the fan-out. Exactly two services per zone.
pub fn fallback_rates(zone: Zone) -> [FallbackRate; 2] {
    match zone {
        Zone::Local => [
            FallbackRate {
                service_name: "Standard",
                price_cents: 6500,
                estimated_days: 2,
            },
            FallbackRate {
                service_name: "Express",
                price_cents: 9500,
                estimated_days: 1,
            },
        ],
        Zone::Provincial => [
            FallbackRate {
                service_name: "Standard",
                price_cents: 8500,
                estimated_days: 3,
            },
            FallbackRate {
                service_name: "Express",
                price_cents: 13500,
                estimated_days: 1,
            },
        ],
        Zone::National => [
            FallbackRate {
                service_name: "Standard",
                price_cents: 9900,
                estimated_days: 4,
            },
            FallbackRate {
                service_name: "Express",
                price_cents: 15900,
                estimated_days: 2,
            },
        ],
    }
}
