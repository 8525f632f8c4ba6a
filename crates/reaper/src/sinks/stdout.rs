use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use super::AlertSink;
use crate::outcome::{AlertLevel, OutcomeRecord};

#[derive(Debug, Deserialize)]
pub struct StdoutConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

/// Logs every outcome through the process logger. With level "info" only
/// informational records are emitted; with level "error" failed outcomes are
/// logged as well.
#[derive(Debug)]
pub struct StdoutSink {
    level: String,
}

impl StdoutSink {
    pub fn new(config: StdoutConfig) -> Self {
        Self {
            level: config.level.to_lowercase(),
        }
    }
}

#[async_trait]
impl AlertSink for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.level == "info" || self.level == "error" {
            return Ok(());
        }
        Err(anyhow::anyhow!("level must be info or error"))
    }

    async fn send(&self, record: &OutcomeRecord) -> anyhow::Result<()> {
        let end_time = record
            .end_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        match record.level {
            AlertLevel::Info => {
                let value = format!(
                    "{} with exit code [{}] for {}",
                    record.status, record.exit_code, record.message
                );
                info!(
                    "[{} in {}] Reaping @ [{}] @ {}",
                    record.name, record.namespace, value, end_time
                );
            }
            AlertLevel::Error => {
                if self.level == "error" {
                    error!(
                        "{} {} {} {}",
                        record.name, record.namespace, record.message, end_time
                    );
                }
            }
        }
        Ok(())
    }
}
