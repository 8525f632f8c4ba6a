pub mod config;
pub mod kubernetes;
pub mod metrics;
pub mod outcome;
pub mod policy;
pub mod reaper;
pub mod server;
pub mod shutdown;
pub mod sinks;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sink error: {0}")]
    Sink(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
