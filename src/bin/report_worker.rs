use std::sync::Arc;

use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agrimarket_backend::config::AppConfig;
use agrimarket_backend::jobs::report_consumer::start_report_consumers;
use agrimarket_backend::services::amqp::create_pool;
use agrimarket_backend::services::report_renderer::ReportRenderer;
use agrimarket_backend::services::report_worker::ReportWorker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,agrimarket_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    let pool = create_pool(&config.broker.url)?;
    let worker = Arc::new(ReportWorker::new(
        db,
        ReportRenderer::new(config.reports_dir.clone()),
    ));

    tracing::info!(
        exchange = %config.broker.exchange,
        reports_dir = %config.reports_dir.display(),
        "Starting report worker"
    );

    let consumers = start_report_consumers(pool, config.broker.exchange.clone(), worker);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down report worker");

    for consumer in consumers {
        consumer.abort();
    }

    Ok(())
}
