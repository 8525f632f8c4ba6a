use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::AlertSink;
use crate::outcome::OutcomeRecord;

#[derive(Debug, Deserialize)]
pub struct WebhookConfig {
    pub endpoint: String,
}

/// Posts the full outcome record as JSON to an arbitrary HTTP endpoint.
pub struct WebhookSink {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.config.endpoint)?;
        Ok(())
    }

    async fn send(&self, record: &OutcomeRecord) -> anyhow::Result<()> {
        self.client
            .post(&self.config.endpoint)
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
