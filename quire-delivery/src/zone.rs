use quire_core::address::Address;
use serde::{Deserialize, Serialize};

/// Delivery distance band for a shipment. The single source of zone truth:
/// the fallback rate table and cost reporting both classify through here so
/// live and degraded pricing can never diverge on zoning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Zone {
    Local,
    Provincial,
    National,
}

/// Major metros recognized by postal-code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metro {
    Johannesburg,
    Pretoria,
    CapeTown,
    Durban,
    Gqeberha,
    Bloemfontein,
    EastLondon,
}

fn metro_for(postal_code: &str) -> Option<Metro> {
    let code: u32 = postal_code.trim().parse().ok()?;
    match code {
        1..=299 => Some(Metro::Pretoria),
        2000..=2199 => Some(Metro::Johannesburg),
        4000..=4099 => Some(Metro::Durban),
        5200..=5299 => Some(Metro::EastLondon),
        6000..=6099 => Some(Metro::Gqeberha),
        7100..=8099 => Some(Metro::CapeTown),
        9300..=9399 => Some(Metro::Bloemfontein),
        _ => None,
    }
}

fn normalize_province(province: &str) -> String {
    province
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Classify an (origin, destination) pair. Same metro means Local; same
/// province in different metros means Provincial; everything else National.
/// Unknown postal codes fall through to the province comparison.
pub fn classify(origin: &Address, destination: &Address) -> Zone {
    let from_metro = metro_for(&origin.postal_code);
    let to_metro = metro_for(&destination.postal_code);

    if let (Some(a), Some(b)) = (from_metro, to_metro) {
        if a == b {
            return Zone::Local;
        }
    }

    if normalize_province(&origin.province) == normalize_province(&destination.province) {
        Zone::Provincial
    } else {
        Zone::National
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(city: &str, province: &str, postal_code: &str) -> Address {
        Address {
            street: "1 Test Street".to_string(),
            suburb: None,
            city: city.to_string(),
            province: province.to_string(),
            postal_code: postal_code.to_string(),
            country: "ZA".to_string(),
        }
    }

    #[test]
    fn same_metro_is_local() {
        let a = address("Cape Town", "Western Cape", "7700");
        let b = address("Cape Town", "Western Cape", "8001");
        assert_eq!(classify(&a, &b), Zone::Local);
    }

    #[test]
    fn same_province_different_metro_is_provincial() {
        let a = address("Johannesburg", "Gauteng", "2092");
        let b = address("Pretoria", "Gauteng", "0181");
        assert_eq!(classify(&a, &b), Zone::Provincial);
    }

    #[test]
    fn cross_province_is_national() {
        let a = address("Cape Town", "Western Cape", "7700");
        let b = address("Johannesburg", "Gauteng", "2000");
        assert_eq!(classify(&a, &b), Zone::National);
    }

    #[test]
    fn unknown_postal_codes_fall_back_to_province() {
        let a = address("George", "Western Cape", "6530");
        let b = address("Mossel Bay", "western cape", "6506");
        assert_eq!(classify(&a, &b), Zone::Provincial);
    }
}
