use serde::{Deserialize, Serialize};

/// A resolved street address. Every field is required before the address
/// can be used for courier quoting or checkout progression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub suburb: Option<String>,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Whether all mandatory fields are populated (non-blank).
    pub fn is_complete(&self) -> bool {
        !self.street.trim().is_empty()
            && !self.city.trim().is_empty()
            && !self.province.trim().is_empty()
            && !self.postal_code.trim().is_empty()
            && !self.country.trim().is_empty()
    }

    /// Stable fingerprint of the routable fields, used to detect address
    /// changes between quote fetches.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.street.trim().to_lowercase(),
            self.city.trim().to_lowercase(),
            self.province.trim().to_lowercase(),
            self.postal_code.trim(),
        )
    }
}

/// Physical parcel description sent to courier clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parcel {
    pub weight_kg: f64,
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
    /// Declared value in cents, used for courier insurance.
    pub declared_value_cents: i32,
}

impl Parcel {
    /// A single average textbook. Listings without explicit dimensions
    /// quote against this.
    pub fn standard_textbook() -> Self {
        Self {
            weight_kg: 1.2,
            length_cm: 30.0,
            width_cm: 23.0,
            height_cm: 4.0,
            declared_value_cents: 0,
        }
    }
}
