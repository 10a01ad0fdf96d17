use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use quire_checkout::{CheckoutSession, ItemSelection};
use quire_core::address::Address;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{checkout_error, AppError};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/checkout", post(begin_checkout))
        .route("/v1/checkout/{id}", get(get_session))
        .route("/v1/checkout/{id}/items", put(set_items))
        .route("/v1/checkout/{id}/address", put(set_address))
        .route("/v1/checkout/{id}/advance", post(advance))
        .route("/v1/checkout/{id}/back", post(back))
        .route("/v1/checkout/{id}/quote", put(select_quote))
        .route("/v1/checkout/{id}/pay", post(pay))
}

#[derive(Deserialize)]
pub struct BeginCheckoutRequest {
    pub buyer_id: String,
    pub buyer_email: String,
    pub seller_id: String,
    pub seller_email: String,
    pub seller_subaccount: Option<String>,
    pub pickup_address: Address,
}

#[derive(Deserialize)]
pub struct SetItemsRequest {
    pub items: Vec<ItemSelection>,
}

#[derive(Deserialize)]
pub struct SetAddressRequest {
    pub address: Address,
}

#[derive(Deserialize)]
pub struct SelectQuoteRequest {
    pub carrier_id: String,
    pub service_name: String,
}

fn session_for(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<tokio::sync::Mutex<CheckoutSession>>, AppError> {
    state
        .sessions
        .get(id)
        .ok_or_else(|| AppError::NotFoundError(format!("Checkout session not found: {id}")))
}

pub async fn begin_checkout(
    State(state): State<AppState>,
    Json(req): Json<BeginCheckoutRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = state.orchestrator.begin(
        req.buyer_id,
        req.buyer_email,
        req.seller_id,
        req.seller_email,
        req.seller_subaccount,
        req.pickup_address,
    );
    let view = session.clone();
    state.sessions.insert(session);
    tracing::info!(session_id = %view.id, buyer_id = %view.buyer_id, "checkout session opened");
    Ok(Json(view))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let view = session.lock().await.clone();
    Ok(Json(view))
}

pub async fn set_items(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetItemsRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    state
        .orchestrator
        .set_items(&mut guard, req.items)
        .map_err(checkout_error)?;
    Ok(Json(guard.clone()))
}

pub async fn set_address(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetAddressRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    state
        .orchestrator
        .set_shipping_address(&mut guard, req.address)
        .map_err(checkout_error)?;
    Ok(Json(guard.clone()))
}

pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    state
        .orchestrator
        .advance(&mut guard)
        .await
        .map_err(checkout_error)?;
    Ok(Json(guard.clone()))
}

pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    state
        .orchestrator
        .back(&mut guard)
        .map_err(checkout_error)?;
    Ok(Json(guard.clone()))
}

pub async fn select_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectQuoteRequest>,
) -> Result<Json<CheckoutSession>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    state
        .orchestrator
        .select_quote(&mut guard, &req.carrier_id, &req.service_name)
        .map_err(checkout_error)?;
    Ok(Json(guard.clone()))
}

pub async fn pay(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<quire_order::Order>, AppError> {
    let session = session_for(&state, id)?;
    let mut guard = session.lock().await;
    let order = state
        .orchestrator
        .pay(&mut guard)
        .await
        .map_err(checkout_error)?;
    drop(guard);

    // Completed sessions have no further use; abandon the ephemeral state.
    state.sessions.remove(id);
    tracing::info!(session_id = %id, order_id = %order.id, "checkout completed");
    Ok(Json(order))
}
