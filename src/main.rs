use std::sync::Arc;

use agrimarket_backend::{
    config::AppConfig,
    router,
    services::{
        amqp::AmqpPublisher, cache::build_cache, harvest::HarvestService,
        price_revision::PriceService, report_dispatcher::ReportDispatcher,
        report_resolver::ReportResolver,
    },
    AppState,
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agrimarket_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env().expect("Invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let cache = build_cache(&config.cache)
        .await
        .expect("Failed to initialize cache");

    let publisher = AmqpPublisher::connect(&config.broker)
        .await
        .expect("Failed to connect to message broker");

    let state = AppState {
        prices: PriceService::new(db.clone(), cache.clone(), &config.cache),
        harvests: HarvestService::new(db, cache, &config.cache),
        dispatcher: Arc::new(ReportDispatcher::new(
            Arc::new(publisher),
            config.broker.exchange.clone(),
            config.public_base_url.clone(),
        )),
        resolver: Arc::new(ReportResolver::new(config.reports_dir.clone())),
    };

    // Build router
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
