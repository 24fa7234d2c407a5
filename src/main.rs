//! Certify Commerce server

use std::error::Error;
use std::process;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use certify_commerce::adapters::gateways::{GatewayClient, GatewayRegistry};
use certify_commerce::adapters::http::{commerce_app, CommerceAppState};
use certify_commerce::adapters::postgres::{
    run_migrations, PostgresGatewaySettingRepository, PostgresOrderRepository,
    PostgresPaymentLedger, PostgresProductCatalog, PostgresSubscriptionRepository,
};
use certify_commerce::adapters::{
    AesGcmCipher, InMemoryCommerceStore, InMemoryEventBus, RateCommissionCalculator,
};
use certify_commerce::application::handlers::SweepSubscriptionsHandler;
use certify_commerce::config::{AppConfig, SubscriptionConfig};
use certify_commerce::domain::foundation::Timestamp;
use certify_commerce::ports::{
    EventPublisher, GatewaySettingRepository, OrderRepository, PaymentLedger, ProductCatalog,
    SubscriptionRepository,
};

/// Envelopes retained by the in-process event bus.
const EVENT_LOG_CAPACITY: usize = 10_000;

struct Stores {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn PaymentLedger>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    gateway_settings: Arc<dyn GatewaySettingRepository>,
    catalog: Arc<dyn ProductCatalog>,
}

#[tokio::main]
async fn main() {
    let config = AppConfig::load().unwrap_or_else(|e| {
        // Logging is not initialized yet.
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    });

    init_tracing(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "server terminated");
        process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

async fn stores(config: &AppConfig) -> Result<Stores, Box<dyn Error>> {
    let Some(database) = &config.database else {
        tracing::warn!("no database configured, using the in-memory store");
        let store = Arc::new(InMemoryCommerceStore::new());
        return Ok(Stores {
            orders: store.clone(),
            ledger: store.clone(),
            subscriptions: store.clone(),
            gateway_settings: store.clone(),
            catalog: store,
        });
    };

    let pool = database.connect_lazy()?;
    if database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("database migrations applied");
    }

    Ok(Stores {
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        ledger: Arc::new(PostgresPaymentLedger::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        gateway_settings: Arc::new(PostgresGatewaySettingRepository::new(pool.clone())),
        catalog: Arc::new(PostgresProductCatalog::new(pool)),
    })
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    let stores = stores(&config).await?;
    let payment = &config.payment;

    let cipher = Arc::new(AesGcmCipher::from_base64_key(&payment.credential_key)?);
    let events: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::bounded(EVENT_LOG_CAPACITY));
    let gateways = Arc::new(GatewayRegistry::new(
        stores.gateway_settings.clone(),
        cipher.clone(),
        GatewayClient::new(payment.gateway_timeout())?,
        payment.endpoints(),
        payment.webhook_tolerance_secs,
    ));

    spawn_sweeper(
        stores.subscriptions.clone(),
        events.clone(),
        config.subscription.clone(),
    );

    let state = CommerceAppState {
        orders: stores.orders,
        ledger: stores.ledger,
        subscriptions: stores.subscriptions,
        gateway_settings: stores.gateway_settings,
        catalog: stores.catalog,
        gateways,
        commission: Arc::new(RateCommissionCalculator::new(payment.fee_bps, payment.tax_bps)),
        cipher,
        events,
        payment: payment.payment_settings(),
        reconcile_policy: payment.reconcile_policy(),
    };
    let app = commerce_app(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn spawn_sweeper(
    subscriptions: Arc<dyn SubscriptionRepository>,
    events: Arc<dyn EventPublisher>,
    config: SubscriptionConfig,
) {
    let handler = SweepSubscriptionsHandler::new(subscriptions, events, config.grace_period_days);
    let mut ticker = tokio::time::interval(config.sweep_interval());

    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            match handler.handle(Timestamp::now()).await {
                Ok(report) => tracing::debug!(
                    finalized = report.finalized,
                    expired = report.expired,
                    failed = report.failed,
                    "subscription sweep finished"
                ),
                Err(e) => tracing::warn!(error = %e, "subscription sweep failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
