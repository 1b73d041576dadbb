//! Alert sink backed by NATS.
//!
//! The sink must never apply backpressure to metric computation: a publish
//! failure drops the alert and the caller counts the loss, ingestion keeps
//! going.

use crate::types::alert::Alert;
use anyhow::Result;
use async_nats::Client;
use tracing::{debug, error};

/// Publisher for structured alerts
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    /// Create a new alert producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a single alert
    pub async fn publish(&self, alert: &Alert) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            kind = %alert.kind.as_str(),
            severity = ?alert.severity,
            "Published alert"
        );

        Ok(())
    }

    /// Publish a batch of alerts, dropping any that fail.
    ///
    /// Returns the number of alerts dropped so the caller can record the
    /// counted loss.
    pub async fn publish_batch(&self, alerts: &[Alert]) -> u64 {
        let mut dropped = 0;
        for alert in alerts {
            if let Err(e) = self.publish(alert).await {
                dropped += 1;
                error!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to publish alert, dropping"
                );
            }
        }
        dropped
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
