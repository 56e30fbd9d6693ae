//! Job Dispatcher
//!
//! Turns a report request into a broker message and hands the client the URL
//! to poll. Publishing is synchronous: when the broker is unreachable the
//! request fails right away, nothing is queued locally.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

use crate::models::report::{ReportRequest, ReportTicket, REPORT_ACCEPTED_MESSAGE};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Outbound side of the broker
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Resolves once the broker has accepted the message
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to encode report job: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish report job: {0}")]
    Publish(#[from] BrokerError),
}

pub struct ReportDispatcher {
    publisher: Arc<dyn JobPublisher>,
    exchange: String,
    public_base_url: String,
}

impl ReportDispatcher {
    pub fn new(
        publisher: Arc<dyn JobPublisher>,
        exchange: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            publisher,
            exchange: exchange.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub async fn request_report(&self, request: &ReportRequest) -> Result<ReportTicket, DispatchError> {
        request.range.validate().map_err(DispatchError::Validation)?;

        let routing_key = request.kind().routing_key();
        let payload = serde_json::to_vec(&request.to_message())?;

        self.publisher
            .publish(&self.exchange, routing_key, payload)
            .await
            .map_err(|e| {
                error!(
                    exchange = %self.exchange,
                    routing_key = %routing_key,
                    error = %e,
                    "Failed to publish report job"
                );
                e
            })?;

        info!(
            exchange = %self.exchange,
            routing_key = %routing_key,
            start_date = %request.range.start_date,
            end_date = %request.range.end_date,
            "Report job published"
        );

        Ok(ReportTicket {
            message: REPORT_ACCEPTED_MESSAGE.to_string(),
            download_url: request.download_url(&self.public_base_url),
        })
    }
}
