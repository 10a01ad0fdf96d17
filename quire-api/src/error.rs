use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quire_checkout::CheckoutError;
use quire_order::commitment::CommitmentError;
use quire_order::compensator::CompensationError;
use quire_settlement::CaptureError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    PaymentRequired(String),
    ServiceUnavailable(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

/// Checkout failures carry their own user-facing category; everything the
/// buyer sees goes through `user_message`, the raw error goes to the logs.
pub fn checkout_error(err: CheckoutError) -> AppError {
    let message = err.user_message().to_string();
    let detail = err.to_string();
    match err {
        CheckoutError::Capture(CaptureError::GatewayUnavailable(_)) => {
            tracing::warn!(error = %detail, "capture hit gateway outage");
            AppError::ServiceUnavailable(message)
        }
        CheckoutError::Capture(_) => {
            tracing::warn!(error = %detail, "capture rejected");
            AppError::PaymentRequired(message)
        }
        CheckoutError::CaptureInProgress | CheckoutError::SessionComplete => {
            AppError::ConflictError(detail)
        }
        CheckoutError::Commitment(e) => AppError::Anyhow(e.into()),
        _ => AppError::ValidationError(detail),
    }
}

pub fn commitment_error(err: CommitmentError) -> AppError {
    match err {
        CommitmentError::NotFound(id) => AppError::NotFoundError(format!("Order not found: {id}")),
        CommitmentError::NotPending { .. } => AppError::ConflictError(err.to_string()),
        CommitmentError::Store(_) => AppError::Anyhow(err.into()),
    }
}

pub fn compensation_error(err: CompensationError) -> AppError {
    match err {
        CompensationError::NotFound(id) => {
            AppError::NotFoundError(format!("Order not found: {id}"))
        }
        CompensationError::Committed { .. } => AppError::ConflictError(err.to_string()),
        CompensationError::Store(_) => AppError::Anyhow(err.into()),
    }
}
