use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use quire_core::payment::{
    ChargeRequest, ChargeResponse, GatewayRefundStatus, PaymentError, PaymentGateway,
    RefundRequest, RefundResponse,
};
use serde_json::json;
use uuid::Uuid;

/// Deterministic in-process gateway used for local runs and tests. Charges
/// are idempotent on the caller reference, and magic subaccount codes
/// trigger the classified failure modes.
pub struct SandboxGateway {
    charges: Mutex<HashMap<String, ChargeResponse>>,
    refunds: Mutex<HashMap<String, RefundResponse>>,
    requests: Mutex<Vec<ChargeRequest>>,
}

impl SandboxGateway {
    /// Subaccount whose bank details the provider rejects.
    pub const SUB_BAD_BANK: &'static str = "SUB_SANDBOX_BAD_BANK";
    /// Subaccount that simulates provider downtime.
    pub const SUB_DOWN: &'static str = "SUB_SANDBOX_DOWN";
    /// Payment-reference suffix that makes refunds fail.
    pub const REFUND_FAIL_SUFFIX: &'static str = "_norefund";

    pub fn new() -> Self {
        Self {
            charges: Mutex::new(HashMap::new()),
            refunds: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of distinct charges actually created.
    pub fn charge_count(&self) -> usize {
        self.charges.lock().unwrap().len()
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.lock().unwrap().len()
    }

    /// The most recent charge request seen, idempotent replays included.
    pub fn last_charge(&self) -> Option<ChargeRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, PaymentError> {
        self.requests.lock().unwrap().push(request.clone());

        match request.subaccount_code.as_str() {
            Self::SUB_BAD_BANK => {
                return Err(PaymentError::InvalidBankDetails(
                    "account number failed bank verification".to_string(),
                ))
            }
            Self::SUB_DOWN => {
                return Err(PaymentError::GatewayUnavailable(
                    "sandbox provider offline".to_string(),
                ))
            }
            _ => {}
        }

        let mut charges = self.charges.lock().unwrap();
        // Same reference, same charge: the provider's idempotency contract.
        if let Some(existing) = charges.get(&request.reference) {
            return Ok(existing.clone());
        }

        let response = ChargeResponse {
            payment_reference: format!("pay_{}", Uuid::new_v4().simple()),
            amount_cents: request.amount_cents,
            currency: request.currency.clone(),
            created_at: Utc::now(),
        };
        charges.insert(request.reference.clone(), response.clone());
        Ok(response)
    }

    async fn refund(&self, request: &RefundRequest) -> Result<RefundResponse, PaymentError> {
        if request.payment_reference.ends_with(Self::REFUND_FAIL_SUFFIX) {
            return Err(PaymentError::GatewayUnavailable(
                "sandbox refund endpoint offline".to_string(),
            ));
        }

        let mut refunds = self.refunds.lock().unwrap();
        if let Some(existing) = refunds.get(&request.payment_reference) {
            return Ok(existing.clone());
        }

        let response = RefundResponse {
            refund_reference: format!("rf_{}", Uuid::new_v4().simple()),
            status: GatewayRefundStatus::Processed,
            raw: json!({
                "payment_reference": request.payment_reference,
                "amount": request.amount_cents,
                "reason": request.reason,
                "sandbox": true,
            }),
        };
        refunds.insert(request.payment_reference.clone(), response.clone());
        Ok(response)
    }
}
