use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gateway-side status of a refund request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayRefundStatus {
    Pending,
    Processed,
    Failed,
}

/// A split-routed charge request. `seller_amount` is routed to the seller's
/// subaccount by the gateway itself; the platform share stays on the main
/// account. Routing is expressed here, never recomputed after capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Caller-generated idempotency reference. Retrying the same logical
    /// attempt must reuse the same value.
    pub reference: String,
    pub amount_cents: i32,
    pub currency: String,
    pub buyer_email: String,
    /// Previously provisioned seller subaccount code.
    pub subaccount_code: String,
    /// Platform share of `amount_cents` retained on the main account.
    pub platform_fee_cents: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeResponse {
    /// The gateway's payment/authorization reference.
    pub payment_reference: String,
    pub amount_cents: i32,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Reference of the original captured payment.
    pub payment_reference: String,
    pub amount_cents: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub refund_reference: String,
    pub status: GatewayRefundStatus,
    /// Raw provider payload, kept for reconciliation.
    pub raw: serde_json::Value,
}

/// Classified gateway failures. Only `GatewayUnavailable` may be retried,
/// and only by the caller with the same idempotency reference.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Invalid bank details: {0}")]
    InvalidBankDetails(String),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Duplicate charge for reference {0}")]
    DuplicateCharge(String),
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::GatewayUnavailable(_))
    }
}

/// Adapter over the external payment provider. Implementations translate
/// provider responses into the classified error taxonomy above.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Capture a split-routed charge.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, PaymentError>;

    /// Refund a previously captured payment, full or partial.
    async fn refund(&self, request: &RefundRequest) -> Result<RefundResponse, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailability_is_retryable() {
        assert!(PaymentError::GatewayUnavailable("timeout".into()).is_retryable());
        assert!(!PaymentError::InvalidBankDetails("bad branch code".into()).is_retryable());
        assert!(!PaymentError::DuplicateCharge("ref-1".into()).is_retryable());
    }
}
