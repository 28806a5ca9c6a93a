use clap::Parser;
use preread::components::preread_job::{scheduler, JobHandle, JobOutcome};
use preread::error::job_error;
use preread::{shutdown, startup};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Build today's meeting prereads and mail them as one digest
#[derive(Debug, Parser)]
#[command(name = "preread_job", version)]
struct Args {
    /// Stay alive and run once a day at DAILY_RUN_TIME
    #[arg(long)]
    daemon: bool,

    /// Print the digest instead of sending it
    #[arg(long, conflicts_with = "daemon")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let args = Args::parse();
    startup::init_logging()?;

    let config = startup::load_config().await?;
    let pipeline = startup::build_pipeline(Arc::clone(&config)).await;

    if args.daemon {
        info!("Starting preread scheduler");
        let job = JobHandle::spawn(pipeline);
        let cancel = CancellationToken::new();

        let scheduler_task = tokio::spawn(scheduler::run_daily(
            Arc::clone(&config),
            job.clone(),
            cancel.clone(),
        ));

        shutdown::wait_for_signal().await;
        cancel.cancel();
        if let Err(e) = scheduler_task.await {
            error!("Scheduler task failed: {}", e);
        }
        job.shutdown().await?;
        return Ok(());
    }

    let day = pipeline.today().await?;

    if args.dry_run {
        match pipeline.prepare(day).await? {
            Some(prepared) => {
                println!("From: {}", prepared.sender);
                println!("To: {}", prepared.recipient);
                println!("Subject: {}", prepared.digest.subject);
                println!();
                println!("{}", prepared.digest.body);
            }
            None => info!("No valid credential, nothing to preview"),
        }
        return Ok(());
    }

    match pipeline.run(day).await? {
        JobOutcome::Sent {
            subject, recipient, ..
        } => info!("Sent \"{}\" to {}", subject, recipient),
        JobOutcome::Skipped => info!("No valid credential, run skipped"),
        JobOutcome::AlreadyRunning => {
            return Err(job_error("Another preread run is in progress").into());
        }
    }

    Ok(())
}
