use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use quire_order::{CompensationOutcome, Order, RefundTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{commitment_error, compensation_error, AppError};
use crate::state::AppState;

/// Reason recorded when the seller turns the sale down themselves, as
/// opposed to the deadline sweep doing it for them.
const REASON_SELLER_DECLINED: &str = "SELLER_DECLINED";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/orders", get(list_orders))
        .route("/v1/orders/{id}", get(get_order))
        .route("/v1/orders/{id}/commit", post(commit_order))
        .route("/v1/orders/{id}/decline", post(decline_order))
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub buyer_id: String,
}

#[derive(Deserialize)]
pub struct DeclineOrderRequest {
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct DeclineOrderResponse {
    pub order: Order,
    pub refund: Option<RefundTransaction>,
    /// True when a previous decline already settled this order and this
    /// call changed nothing.
    pub already_settled: bool,
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .order_store
        .get_order(id)
        .await
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFoundError(format!("Order not found: {id}")))?;
    Ok(Json(order))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = state
        .order_store
        .list_orders_for_buyer(&query.buyer_id)
        .await
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!(e)))?;
    Ok(Json(orders))
}

pub async fn commit_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.tracker.commit(id).await.map_err(commitment_error)?;
    Ok(Json(order))
}

pub async fn decline_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeclineOrderRequest>,
) -> Result<Json<DeclineOrderResponse>, AppError> {
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| REASON_SELLER_DECLINED.to_string());

    let outcome = state
        .compensator
        .compensate(id, &reason)
        .await
        .map_err(compensation_error)?;

    let order = state
        .order_store
        .get_order(id)
        .await
        .map_err(|e| AppError::Anyhow(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFoundError(format!("Order not found: {id}")))?;

    let (refund, already_settled) = match outcome {
        CompensationOutcome::Compensated(tx) => (Some(tx), false),
        CompensationOutcome::AlreadySettled(tx) => (tx, true),
    };
    Ok(Json(DeclineOrderResponse {
        order,
        refund,
        already_settled,
    }))
}
