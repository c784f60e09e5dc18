use crate::core::RateService;
use anyhow::Result;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

/// Runs an update cycle every `every` until Ctrl-C.
pub async fn run(service: Arc<RateService>, every: Duration) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };
    let started = run_until(service, every, shutdown).await?;
    info!(cycles = started, "Scheduler stopped");
    Ok(())
}

/// Runs update cycles on a fixed interval until `shutdown` resolves, then
/// waits for cycles already in flight. Returns how many cycles were started.
pub async fn run_until<F>(service: Arc<RateService>, every: Duration, shutdown: F) -> Result<usize>
where
    F: Future<Output = ()>,
{
    info!(interval_secs = every.as_secs(), "Starting scheduled exchange rate updates");

    let mut interval = time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();
    let mut started = 0;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping scheduler");
                break;
            }
            _ = interval.tick() => {
                started += 1;
                let service = service.clone();
                cycles.spawn(async move {
                    info!(triggered_at = %Utc::now(), "Starting scheduled exchange rates update");
                    match service.update_rates().await {
                        Ok(_) => info!("Scheduled exchange rates update completed successfully"),
                        Err(e) => error!(error = %e, "Scheduled exchange rates update failed"),
                    }
                });
            }
            Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "Update cycle task did not complete");
                }
            }
        }
    }

    while let Some(joined) = cycles.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Update cycle task did not complete");
        }
    }
    Ok(started)
}
