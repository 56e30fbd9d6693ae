//! AMQP (RabbitMQ) plumbing for the report pipeline.
//!
//! One durable direct exchange; one durable queue per report kind bound with
//! the kind's routing key. Both the API and the worker declare the topology,
//! so jobs published before the first worker start are kept in their queue.

use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool, PoolError};
use lapin::{
    options::{
        BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, ExchangeKind,
};
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::models::report::ReportKind;
use crate::services::report_dispatcher::{BrokerError, JobPublisher};

const POOL_MAX_SIZE: usize = 10;

/// Persistent delivery mode
const DELIVERY_MODE_PERSISTENT: u8 = 2;

pub fn create_pool(url: &str) -> Result<Pool, BrokerError> {
    let manager = Manager::new(url.to_string(), Default::default());
    Pool::builder(manager)
        .max_size(POOL_MAX_SIZE)
        .build()
        .map_err(|e| BrokerError::Connection(format!("Failed to create pool: {}", e)))
}

pub async fn open_channel(pool: &Pool) -> Result<Channel, BrokerError> {
    let conn = pool.get().await.map_err(|e: PoolError| {
        BrokerError::Connection(format!("Failed to get connection from pool: {}", e))
    })?;

    conn.create_channel()
        .await
        .map_err(|e| BrokerError::Connection(format!("Failed to create channel: {}", e)))
}

pub async fn declare_exchange(channel: &Channel, exchange: &str) -> Result<(), lapin::Error> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Direct,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await
}

/// Declares the durable queue of `kind` and binds it to `exchange`
pub async fn declare_report_queue(
    channel: &Channel,
    exchange: &str,
    kind: ReportKind,
) -> Result<String, lapin::Error> {
    let queue = kind.queue_name();

    channel
        .queue_declare(
            &queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            &queue,
            exchange,
            kind.routing_key(),
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    debug!(queue = %queue, routing_key = %kind.routing_key(), "Bound report queue");
    Ok(queue)
}

pub async fn declare_topology(channel: &Channel, exchange: &str) -> Result<(), lapin::Error> {
    declare_exchange(channel, exchange).await?;
    for kind in ReportKind::ALL {
        declare_report_queue(channel, exchange, kind).await?;
    }
    Ok(())
}

/// Publishes report jobs with publisher confirms
pub struct AmqpPublisher {
    pool: Pool,
}

impl AmqpPublisher {
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let pool = create_pool(&config.url)?;

        let channel = open_channel(&pool).await?;
        declare_topology(&channel, &config.exchange)
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to declare topology: {}", e)))?;

        info!(exchange = %config.exchange, "Connected to AMQP");

        Ok(Self { pool })
    }
}

#[async_trait]
impl JobPublisher for AmqpPublisher {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let channel = open_channel(&self.pool).await?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to enable confirms: {}", e)))?;

        let confirmation = channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(DELIVERY_MODE_PERSISTENT),
            )
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to publish: {}", e)))?
            .await
            .map_err(|e| BrokerError::Connection(format!("Failed to await confirm: {}", e)))?;

        if confirmation.is_nack() {
            return Err(BrokerError::Rejected(format!(
                "broker nacked message for routing key {}",
                routing_key
            )));
        }

        // Publishing opens a fresh channel each time
        if let Err(e) = channel.close(200, "OK").await {
            debug!(error = %e, "Failed to close publish channel");
        }

        Ok(())
    }
}
