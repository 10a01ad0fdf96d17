use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quire_api::{app, AppState};
use quire_checkout::CheckoutOrchestrator;
use quire_core::courier::CourierClient;
use quire_core::notify::LogNotifier;
use quire_core::payment::PaymentGateway;
use quire_delivery::couriers::SandboxCourier;
use quire_delivery::DeliveryQuoteAggregator;
use quire_order::repository::OrderStore;
use quire_order::{CommitmentSweep, CommitmentTracker, RefundCompensator};
use quire_settlement::sandbox::SandboxGateway;
use quire_settlement::SettlementGateway;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quire_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = quire_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Quire API on port {}", config.server.port);

    let db = quire_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let store: Arc<dyn OrderStore> = Arc::new(quire_store::PgOrderStore::new(db.pool.clone()));

    // Sandbox adapters until live courier and gateway credentials are wired
    // in via config.
    let gateway: Arc<dyn PaymentGateway> = Arc::new(SandboxGateway::new());
    let couriers: Vec<Arc<dyn CourierClient>> = vec![
        Arc::new(SandboxCourier::new("sandbox_economy", 0)),
        Arc::new(SandboxCourier::new("sandbox_priority", 1800)),
    ];
    let notifier = Arc::new(LogNotifier);

    let aggregator = Arc::new(DeliveryQuoteAggregator::new(
        couriers,
        Duration::from_millis(config.business_rules.courier_timeout_ms),
    ));
    let settlement = Arc::new(SettlementGateway::new(
        gateway.clone(),
        config.gateway.platform_fee_rate,
        config.gateway.currency.clone(),
    ));
    let tracker = Arc::new(CommitmentTracker::new(
        store.clone(),
        config.business_rules.commit_window_hours,
    ));
    let compensator = Arc::new(RefundCompensator::new(
        store.clone(),
        gateway.clone(),
        notifier,
    ));
    let orchestrator = Arc::new(CheckoutOrchestrator::new(
        aggregator,
        settlement,
        tracker.clone(),
        config.gateway.currency.clone(),
    ));

    let sweep = CommitmentSweep::new(
        store.clone(),
        compensator.clone(),
        Duration::from_secs(config.business_rules.sweep_interval_seconds),
        config.business_rules.sweep_batch_limit,
    );
    tokio::spawn(sweep.run());

    let app_state = AppState {
        orchestrator,
        sessions: Arc::new(quire_api::state::SessionMap::new()),
        order_store: store,
        tracker,
        compensator,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
