//! Best-effort delivery of failure events to the collector webhook.

use std::time::Duration;
use tracing::{error, info};

use crate::error::Result;
use crate::types::{ErrorCode, EventPayload};

pub struct Notifier {
    collector_url: String,
    environment: String,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(collector_url: &str, environment: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            collector_url: collector_url.to_string(),
            environment: environment.to_string(),
            client,
        })
    }

    /// Post one event. Failures are logged and never returned.
    pub async fn send(
        &self,
        customer: &str,
        service_name: &str,
        app_name: &str,
        code: ErrorCode,
        message: &str,
    ) {
        let payload = EventPayload::new(customer, &self.environment, code, message, app_name);
        if let Err(e) = self.post(service_name, &payload).await {
            error!(
                service = service_name,
                code = code.as_str(),
                error = %e,
                "Error sending event to collector"
            );
        }
    }

    async fn post(&self, service_name: &str, payload: &EventPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.collector_url)
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        info!(
            service = service_name,
            pod = %payload.app_name,
            code = payload.error.as_str(),
            status = %status.as_u16(),
            response = %body,
            "Event sent to collector"
        );
        info!("Payload sent:\n{}", serde_json::to_string_pretty(payload)?);
        Ok(())
    }
}
