pub mod slack;
pub mod stdout;
pub mod webhook;

pub use slack::SlackSink;
pub use stdout::StdoutSink;
pub use webhook::WebhookSink;

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::outcome::OutcomeRecord;
use crate::{Error, Result};

/// An alert target. `validate` runs once at startup; a failure there keeps the
/// process from starting. `send` runs once per reaped job, in configured
/// order, and a failure never blocks the other sinks or the deletion.
#[async_trait]
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self) -> anyhow::Result<()>;
    async fn send(&self, record: &OutcomeRecord) -> anyhow::Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkSpec {
    Stdout(stdout::StdoutConfig),
    Slack(slack::SlackConfig),
    Webhook(webhook::WebhookConfig),
}

#[derive(Debug, Deserialize)]
pub struct SinksFile {
    pub sinks: Vec<SinkSpec>,
}

/// Reads the sink configuration file and builds the validated sink set.
pub fn load_sinks(path: &Path) -> Result<Vec<Box<dyn AlertSink>>> {
    let raw = std::fs::read_to_string(path)?;
    let file: SinksFile = serde_yaml::from_str(&raw)
        .map_err(|err| Error::Config(format!("invalid sink configuration: {err}")))?;
    build_sinks(file.sinks)
}

/// Builds each configured sink and validates it, failing fast on the first
/// sink that does not pass.
pub fn build_sinks(specs: Vec<SinkSpec>) -> Result<Vec<Box<dyn AlertSink>>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::with_capacity(specs.len());
    for spec in specs {
        let sink: Box<dyn AlertSink> = match spec {
            SinkSpec::Stdout(config) => Box::new(StdoutSink::new(config)),
            SinkSpec::Slack(config) => Box::new(SlackSink::new(config)),
            SinkSpec::Webhook(config) => Box::new(WebhookSink::new(config)),
        };
        sink.validate()
            .map_err(|err| Error::Sink(format!("{} sink: {err}", sink.name())))?;
        sinks.push(sink);
    }
    if sinks.is_empty() {
        return Err(Error::Config("no alert sinks configured".to_string()));
    }
    Ok(sinks)
}
