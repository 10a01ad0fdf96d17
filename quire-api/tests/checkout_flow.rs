use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use quire_api::state::SessionMap;
use quire_api::{app, AppState};
use quire_checkout::CheckoutOrchestrator;
use quire_core::courier::CourierClient;
use quire_core::notify::LogNotifier;
use quire_core::payment::PaymentGateway;
use quire_delivery::couriers::SandboxCourier;
use quire_delivery::DeliveryQuoteAggregator;
use quire_order::repository::OrderStore;
use quire_order::{CommitmentTracker, InMemoryOrderStore, RefundCompensator};
use quire_settlement::sandbox::SandboxGateway;
use quire_settlement::SettlementGateway;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let store: Arc<dyn OrderStore> = Arc::new(InMemoryOrderStore::new());
    let gateway: Arc<dyn PaymentGateway> = Arc::new(SandboxGateway::new());
    let couriers: Vec<Arc<dyn CourierClient>> =
        vec![Arc::new(SandboxCourier::new("sandbox_economy", 0))];

    let aggregator = Arc::new(DeliveryQuoteAggregator::new(
        couriers,
        Duration::from_millis(500),
    ));
    let settlement = Arc::new(SettlementGateway::new(
        gateway.clone(),
        0.10,
        "ZAR".to_string(),
    ));
    let tracker = Arc::new(CommitmentTracker::new(store.clone(), 48));
    let compensator = Arc::new(RefundCompensator::new(
        store.clone(),
        gateway,
        Arc::new(LogNotifier),
    ));
    let orchestrator = Arc::new(CheckoutOrchestrator::new(
        aggregator,
        settlement,
        tracker.clone(),
        "ZAR".to_string(),
    ));

    app(AppState {
        orchestrator,
        sessions: Arc::new(SessionMap::new()),
        order_store: store,
        tracker,
        compensator,
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn begin_body() -> Value {
    json!({
        "buyer_id": "buyer-1",
        "buyer_email": "buyer@uct.ac.za",
        "seller_id": "seller-1",
        "seller_email": "seller@wits.ac.za",
        "seller_subaccount": "SUB_test_seller",
        "pickup_address": {
            "street": "12 Jorissen St",
            "suburb": "Braamfontein",
            "city": "Johannesburg",
            "province": "Gauteng",
            "postal_code": "2001",
            "country": "ZA"
        }
    })
}

fn shipping_body() -> Value {
    json!({
        "address": {
            "street": "1 Library Rd",
            "suburb": "Rondebosch",
            "city": "Cape Town",
            "province": "Western Cape",
            "postal_code": "7700",
            "country": "ZA"
        }
    })
}

/// Drives a session through every step and returns the captured order.
async fn checkout_to_order(app: &Router) -> Value {
    let (status, session) = send(app, Method::POST, "/v1/checkout", Some(begin_body())).await;
    assert_eq!(status, StatusCode::OK);
    let id = session["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/v1/checkout/{id}/items"),
        Some(json!({
            "items": [{
                "item_id": uuid::Uuid::new_v4(),
                "title": "Principles of Economics",
                "price_cents": 35000
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::POST, &format!("/v1/checkout/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/v1/checkout/{id}/address"),
        Some(shipping_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Entering the delivery step fetches quotes.
    let (status, session) =
        send(app, Method::POST, &format!("/v1/checkout/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    let quotes = session["quotes"].as_array().unwrap();
    assert!(!quotes.is_empty());
    let service = quotes[0]["service_name"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/v1/checkout/{id}/quote"),
        Some(json!({ "carrier_id": "sandbox_economy", "service_name": service })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(app, Method::POST, &format!("/v1/checkout/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, order) = send(app, Method::POST, &format!("/v1/checkout/{id}/pay"), None).await;
    assert_eq!(status, StatusCode::OK);

    // The session is discarded once the order exists.
    let (status, _) = send(app, Method::GET, &format!("/v1/checkout/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    order
}

#[tokio::test]
async fn full_checkout_then_seller_commits() {
    let app = test_app();
    let order = checkout_to_order(&app).await;

    assert_eq!(order["status"], "PENDING_COMMIT");
    assert_eq!(order["buyer_id"], "buyer-1");
    let total = order["total_cents"].as_i64().unwrap();
    let fee = order["platform_fee_cents"].as_i64().unwrap();
    let seller = order["seller_amount_cents"].as_i64().unwrap();
    assert_eq!(fee + seller, total);

    let order_id = order["id"].as_str().unwrap().to_string();
    let (status, committed) = send(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/commit"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(committed["status"], "COMMITTED");

    // Committed orders cannot be declined any more.
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/decline"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn decline_refunds_once_and_is_idempotent() {
    let app = test_app();
    let order = checkout_to_order(&app).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, first) = send(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/decline"),
        Some(json!({ "reason": "Book already sold" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_settled"], false);
    assert_eq!(first["order"]["status"], "REFUNDED");
    assert_eq!(first["refund"]["status"], "PROCESSED");
    assert_eq!(first["refund"]["reason"], "Book already sold");

    let (status, second) = send(
        &app,
        Method::POST,
        &format!("/v1/orders/{order_id}/decline"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_settled"], true);
    // The original refund record is returned unchanged, not a new one.
    assert_eq!(second["refund"]["id"], first["refund"]["id"]);
}

#[tokio::test]
async fn step_guards_surface_as_bad_requests() {
    let app = test_app();
    let (_, session) = send(&app, Method::POST, "/v1/checkout", Some(begin_body())).await;
    let id = session["id"].as_str().unwrap().to_string();

    // Advancing past Items with no items selected is refused.
    let (status, body) =
        send(&app, Method::POST, &format!("/v1/checkout/{id}/advance"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("item"));

    // Unknown sessions and orders are 404s.
    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, Method::GET, &format!("/v1/checkout/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &format!("/v1/orders/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_are_listed_for_the_buyer() {
    let app = test_app();
    let order = checkout_to_order(&app).await;

    let (status, orders) = send(&app, Method::GET, "/v1/orders?buyer_id=buyer-1", None).await;
    assert_eq!(status, StatusCode::OK);
    let orders = orders.as_array().unwrap().clone();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order["id"]);

    let (status, other) = send(&app, Method::GET, "/v1/orders?buyer_id=someone-else", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(other.as_array().unwrap().is_empty());
}
