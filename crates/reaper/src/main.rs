use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use job_reaper::{
    config::Args,
    kubernetes::{ClusterApi, KubeClusterApi},
    metrics,
    reaper::Reaper,
    server,
    shutdown::Shutdown,
    sinks, Error, Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log)
        .map_err(|err| Error::Config(format!("invalid log level {:?}: {err}", args.log)))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    args.validate()?;
    metrics::register_metrics();

    let sinks = sinks::load_sinks(&args.config)?;
    info!("Configured {} alert sink(s)", sinks.len());

    let api: Arc<dyn ClusterApi> = Arc::new(KubeClusterApi::connect().await?);

    let shutdown = Arc::new(Shutdown::default());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested; finishing the current cycle");
                shutdown.request();
            }
        });
    }

    {
        let listen = args.listen.clone();
        tokio::spawn(async move {
            if let Err(err) = server::serve(&listen).await {
                error!(error = %err, "health server exited");
            }
        });
    }

    let reaper = Reaper::new(
        api,
        sinks,
        args.retention_policy(),
        args.reapers,
        args.buffer,
        Arc::clone(&shutdown),
    );
    let interval = Duration::from_secs(args.interval);

    info!("job-reaper running");
    while !shutdown.is_requested() {
        let started = Instant::now();
        reaper.run_cycle().await?;
        metrics::CYCLE_DURATION_SECONDS.set(started.elapsed().as_secs_f64());

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = shutdown.requested() => {}
            }
        }
    }
    info!("job-reaper stopped");
    Ok(())
}
