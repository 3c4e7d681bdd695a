//! Credit reporting to the storefront server
//!
//! Once a note is stacked the money is physically in the cashbox; losing the
//! report means a customer paid for nothing. The reporter retries with
//! backoff before giving up, and the server side is idempotent for completed
//! payments, so a duplicate delivery after a lost acknowledgement is safe.

use async_trait::async_trait;
use shared::{CreditAck, CreditEvent};
use std::time::Duration;
use thiserror::Error;
use tracing::{instrument, warn};

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Credit report failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("Server rejected credit: {0}")]
    Rejected(String),
}

/// Delivers credit events to the storefront gateway
#[async_trait]
pub trait CreditGateway: Send + Sync {
    /// Report one stacked note
    async fn report(&self, event: &CreditEvent) -> Result<CreditAck, ReportError>;
}

pub struct CreditReporter {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl CreditReporter {
    pub fn new(server_url: &str, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: format!(
                "{}/api/payment/insert-event",
                server_url.trim_end_matches('/')
            ),
            api_key: api_key.into(),
        }
    }

    async fn try_report(&self, event: &CreditEvent) -> Result<CreditAck, ReportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(event)
            .send()
            .await
            .map_err(|e| ReportError::Exhausted {
                attempts: 1,
                last_error: e.to_string(),
            })?;

        let status = response.status();
        if status.is_client_error() {
            // 4xx will not heal on retry
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(ReportError::Exhausted {
                attempts: 1,
                last_error: format!("server returned {}", status),
            });
        }

        response.json().await.map_err(|e| ReportError::Exhausted {
            attempts: 1,
            last_error: e.to_string(),
        })
    }
}

#[async_trait]
impl CreditGateway for CreditReporter {
    /// Report one stacked note, retrying transient failures
    #[instrument(skip(self), fields(payment_id = event.payment_id, amount = event.amount))]
    async fn report(&self, event: &CreditEvent) -> Result<CreditAck, ReportError> {
        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_report(event).await {
                Ok(ack) => return Ok(ack),
                Err(ReportError::Rejected(msg)) => return Err(ReportError::Rejected(msg)),
                Err(e) => {
                    last_error = e.to_string();
                    warn!(attempt = attempt, error = %last_error, "Credit report attempt failed");
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt - 1)))
                            .await;
                    }
                }
            }
        }
        Err(ReportError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }
}
