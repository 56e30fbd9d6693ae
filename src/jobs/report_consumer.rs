//! Report queue consumers
//!
//! One task per report queue. Deliveries are consumed with auto-ack, so the
//! broker forgets a job as soon as it is handed over: if the worker dies
//! mid-render the job is lost (at-most-once). The client sees a report that
//! never becomes available and has to request it again.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use deadpool_lapin::Pool;
use futures_util::StreamExt;
use lapin::{options::BasicConsumeOptions, types::FieldTable, Consumer};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::report::ReportKind;
use crate::services::amqp::{declare_exchange, declare_report_queue, open_channel};
use crate::services::report_dispatcher::BrokerError;
use crate::services::report_worker::ReportWorker;

const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(100);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Spawns one consumer task per report kind
pub fn start_report_consumers(
    pool: Pool,
    exchange: String,
    worker: Arc<ReportWorker>,
) -> Vec<JoinHandle<()>> {
    ReportKind::ALL
        .into_iter()
        .map(|kind| {
            let pool = pool.clone();
            let exchange = exchange.clone();
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
                consume_with_reconnect(pool, exchange, kind, worker).await;
            })
        })
        .collect()
}

/// Consumer loop; reconnects with exponential backoff and jitter
async fn consume_with_reconnect(
    pool: Pool,
    exchange: String,
    kind: ReportKind,
    worker: Arc<ReportWorker>,
) {
    let backoff_builder = ExponentialBuilder::default()
        .with_min_delay(MIN_RECONNECT_DELAY)
        .with_max_delay(MAX_RECONNECT_DELAY)
        .with_jitter();
    let mut backoff = backoff_builder.build();

    loop {
        match setup_consumer(&pool, &exchange, kind).await {
            Ok(mut consumer) => {
                info!(queue = %kind.queue_name(), "Report consumer connected");
                backoff = backoff_builder.build();

                while let Some(delivery) = consumer.next().await {
                    match delivery {
                        Ok(delivery) => {
                            // Already acknowledged by the broker (no_ack)
                            let _ = worker.handle_delivery(&delivery.data).await;
                        }
                        Err(e) => {
                            error!(queue = %kind.queue_name(), error = %e, "Delivery error, will reconnect");
                            break;
                        }
                    }
                }

                warn!(queue = %kind.queue_name(), "Consumer stream ended, reconnecting");
            }
            Err(e) => {
                error!(
                    queue = %kind.queue_name(),
                    error = %e,
                    "Failed to set up consumer"
                );
            }
        }

        let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
        tokio::time::sleep(delay).await;
    }
}

async fn setup_consumer(
    pool: &Pool,
    exchange: &str,
    kind: ReportKind,
) -> Result<Consumer, BrokerError> {
    let channel = open_channel(pool).await?;

    declare_exchange(&channel, exchange)
        .await
        .map_err(|e| BrokerError::Connection(format!("Failed to declare exchange: {}", e)))?;
    let queue = declare_report_queue(&channel, exchange, kind)
        .await
        .map_err(|e| BrokerError::Connection(format!("Failed to declare queue: {}", e)))?;

    channel
        .basic_consume(
            &queue,
            &format!("report-worker-{}", kind.routing_key()),
            BasicConsumeOptions {
                no_ack: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
        .map_err(|e| BrokerError::Connection(format!("Failed to start consumer: {}", e)))
}
