use super::actor::Trigger;
use super::handle::JobHandle;
use super::pipeline::JobOutcome;
use crate::config::SharedConfig;
use crate::utils::time::{next_daily_run, wait_duration};
use chrono::Utc;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Trigger the job once a day at the configured time until cancelled
pub async fn run_daily(config: SharedConfig, handle: JobHandle, cancel: CancellationToken) {
    loop {
        let next = {
            let config_read = config.read().await;
            config_read.tz().and_then(|tz| {
                let now = Utc::now().with_timezone(&tz);
                next_daily_run(&now, &config_read.daily_run_time).map(|next| (now, next))
            })
        };

        let (now, next) = match next {
            Ok(pair) => pair,
            Err(e) => {
                error!("Failed to calculate next run time: {}", e);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(Duration::from_secs(3600)) => {} // Retry in an hour
                }
                continue;
            }
        };

        info!("Next preread run scheduled for {}", next);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait_duration(&now, &next)) => {}
        }

        match handle.trigger(Trigger::Scheduled).await {
            Ok(JobOutcome::Sent { subject, .. }) => info!("Scheduled run sent \"{}\"", subject),
            Ok(JobOutcome::Skipped) => info!("Scheduled run skipped: no valid credential"),
            Ok(JobOutcome::AlreadyRunning) => info!("Scheduled run coalesced into a running one"),
            Err(e) => error!("Scheduled run failed: {}", e),
        }
    }

    info!("Daily scheduler stopped");
}
