use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::AlertSink;
use crate::outcome::{AlertLevel, OutcomeRecord};

#[derive(Debug, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub channel: Option<String>,
    /// Only post failed outcomes. Defaults to true.
    #[serde(default = "default_errors_only")]
    pub errors_only: bool,
}

fn default_errors_only() -> bool {
    true
}

/// Posts outcome summaries to a Slack incoming webhook.
pub struct SlackSink {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackSink {
    pub fn new(config: SlackConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn format_message(record: &OutcomeRecord) -> String {
        format!(
            "*{}* in `{}`: {} (exit code {}) {}",
            record.name, record.namespace, record.status, record.exit_code, record.message
        )
    }
}

#[async_trait]
impl AlertSink for SlackSink {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.config.webhook_url.is_empty() {
            return Err(anyhow::anyhow!("webhook_url must be supplied"));
        }
        Url::parse(&self.config.webhook_url)?;
        Ok(())
    }

    async fn send(&self, record: &OutcomeRecord) -> anyhow::Result<()> {
        if self.config.errors_only && record.level != AlertLevel::Error {
            return Ok(());
        }

        let mut payload = json!({ "text": Self::format_message(record) });
        if let Some(channel) = &self.config.channel {
            payload["channel"] = json!(channel);
        }

        self.client
            .post(&self.config.webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(webhook_url: &str) -> SlackSink {
        SlackSink::new(SlackConfig {
            webhook_url: webhook_url.to_string(),
            channel: None,
            errors_only: true,
        })
    }

    #[test]
    fn validate_requires_a_parseable_webhook_url() {
        assert!(sink("https://hooks.slack.com/services/T0/B0/x").validate().is_ok());
        assert!(sink("").validate().is_err());
        assert!(sink("not a url").validate().is_err());
    }

    #[tokio::test]
    async fn info_records_are_skipped_when_errors_only() {
        // No HTTP request is made for a filtered record, so an unroutable
        // webhook URL must not produce an error.
        let sink = sink("https://hooks.invalid/services/none");
        let record = OutcomeRecord {
            name: "batch-1".to_string(),
            message: String::new(),
            status: "Succeeded".to_string(),
            start_time: None,
            end_time: None,
            exit_code: 0,
            namespace: "default".to_string(),
            annotations: Default::default(),
            level: AlertLevel::Info,
        };
        assert!(sink.send(&record).await.is_ok());
    }
}
