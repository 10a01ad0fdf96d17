use std::sync::Arc;

use quire_core::payment::{ChargeRequest, PaymentError, PaymentGateway};
use serde::{Deserialize, Serialize};

use crate::split::SplitComputation;

/// Result of a successful split-routed capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub payment_reference: String,
    pub split: SplitComputation,
}

/// Failure taxonomy surfaced to the checkout flow. Only
/// `GatewayUnavailable` is safe to retry, and only with the same
/// idempotency reference.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Seller payment setup incomplete")]
    SellerSetupIncomplete,
    #[error("Invalid bank details: {0}")]
    InvalidBankDetails(String),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("Duplicate charge for reference {0}")]
    DuplicateCharge(String),
}

impl CaptureError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::GatewayUnavailable(_))
    }
}

impl From<PaymentError> for CaptureError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidBankDetails(msg) => CaptureError::InvalidBankDetails(msg),
            PaymentError::GatewayUnavailable(msg) => CaptureError::GatewayUnavailable(msg),
            PaymentError::DuplicateCharge(reference) => CaptureError::DuplicateCharge(reference),
        }
    }
}

/// Computes the platform/seller split for an order total and captures a
/// charge routed to the seller's subaccount. The split is expressed in the
/// gateway request itself, never recomputed client-side after capture.
pub struct SettlementGateway {
    gateway: Arc<dyn PaymentGateway>,
    platform_fee_rate: f64,
    currency: String,
}

impl SettlementGateway {
    pub fn new(gateway: Arc<dyn PaymentGateway>, platform_fee_rate: f64, currency: String) -> Self {
        Self {
            gateway,
            platform_fee_rate,
            currency,
        }
    }

    pub fn split_for(&self, total_cents: i32) -> SplitComputation {
        SplitComputation::compute(total_cents, self.platform_fee_rate)
    }

    /// Capture `total_cents` from the buyer, routing the seller's share to
    /// `subaccount_code`. The subaccount must have been provisioned during
    /// seller onboarding; its absence is a precondition failure and no
    /// gateway call is attempted.
    pub async fn capture(
        &self,
        buyer_email: &str,
        subaccount_code: Option<&str>,
        total_cents: i32,
        reference: &str,
    ) -> Result<CaptureOutcome, CaptureError> {
        let subaccount_code = match subaccount_code {
            Some(code) if !code.trim().is_empty() => code,
            _ => {
                tracing::warn!(reference, "capture refused: seller has no subaccount");
                return Err(CaptureError::SellerSetupIncomplete);
            }
        };

        let split = self.split_for(total_cents);
        let request = ChargeRequest {
            reference: reference.to_string(),
            amount_cents: split.total_cents,
            currency: self.currency.clone(),
            buyer_email: buyer_email.to_string(),
            subaccount_code: subaccount_code.to_string(),
            platform_fee_cents: split.platform_fee_cents,
        };

        match self.gateway.charge(&request).await {
            Ok(response) => {
                tracing::info!(
                    reference,
                    payment_reference = %response.payment_reference,
                    total_cents = split.total_cents,
                    platform_fee_cents = split.platform_fee_cents,
                    "payment captured"
                );
                Ok(CaptureOutcome {
                    payment_reference: response.payment_reference,
                    split,
                })
            }
            Err(e) => {
                tracing::error!(
                    operation = "capture",
                    reference,
                    subaccount = subaccount_code,
                    error = %e,
                    "gateway charge failed"
                );
                Err(e.into())
            }
        }
    }
}
