use super::pipeline::{JobOutcome, PrereadPipeline};
use crate::error::PrereadResult;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info};

/// What asked for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
}

/// Record of the last finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Errors are kept as text so the report can be shared
    pub outcome: Result<JobOutcome, String>,
}

impl RunReport {
    /// One-line description for the dashboard
    pub fn describe(&self) -> String {
        match &self.outcome {
            Ok(JobOutcome::Sent {
                subject, recipient, ..
            }) => format!("Sent \"{}\" to {}", subject, recipient),
            Ok(JobOutcome::Skipped) => "Skipped: not logged in".to_string(),
            Ok(JobOutcome::AlreadyRunning) => "Skipped: another run was in progress".to_string(),
            Err(e) => format!("Failed: {}", e),
        }
    }
}

/// Published after every state change
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub state: JobState,
    pub last_report: Option<RunReport>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            state: JobState::Idle,
            last_report: None,
        }
    }
}

/// Commands that can be sent to the job actor
pub enum JobCommand {
    Run {
        trigger: Trigger,
        respond_to: oneshot::Sender<PrereadResult<JobOutcome>>,
    },
    Shutdown,
}

struct Finished {
    report: RunReport,
}

/// Owns the idle/running state machine; one run at a time
pub struct JobActor {
    pipeline: PrereadPipeline,
    command_rx: mpsc::Receiver<JobCommand>,
    status_tx: watch::Sender<JobStatus>,
    done_tx: mpsc::Sender<Finished>,
    done_rx: mpsc::Receiver<Finished>,
}

impl JobActor {
    pub fn new(
        pipeline: PrereadPipeline,
        command_rx: mpsc::Receiver<JobCommand>,
        status_tx: watch::Sender<JobStatus>,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::channel(1);
        Self {
            pipeline,
            command_rx,
            status_tx,
            done_tx,
            done_rx,
        }
    }

    /// Start the actor's processing loop
    pub async fn run(mut self) {
        info!("Preread job actor started");
        let mut running = false;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(JobCommand::Run { trigger, respond_to }) => {
                        if running {
                            info!("Run already in progress, {} trigger coalesced", trigger);
                            let _ = respond_to.send(Ok(JobOutcome::AlreadyRunning));
                            continue;
                        }
                        running = true;
                        self.set_state(JobState::Running);
                        self.start_run(trigger, respond_to);
                    }
                    Some(JobCommand::Shutdown) | None => {
                        info!("Preread job actor shutting down");
                        break;
                    }
                },
                Some(finished) = self.done_rx.recv() => {
                    running = false;
                    self.publish(finished.report);
                }
            }
        }

        // Let an in-flight run finish so a digest is never cut off mid-send
        if running {
            if let Some(finished) = self.done_rx.recv().await {
                self.publish(finished.report);
            }
        }

        info!("Preread job actor shut down");
    }

    fn start_run(&self, trigger: Trigger, respond_to: oneshot::Sender<PrereadResult<JobOutcome>>) {
        let pipeline = self.pipeline.clone();
        let done_tx = self.done_tx.clone();

        tokio::spawn(async move {
            info!("Starting {} preread run", trigger);
            let started_at = Utc::now();
            let result = pipeline.run_today().await;
            let finished_at = Utc::now();

            let outcome = match &result {
                Ok(outcome) => Ok(outcome.clone()),
                Err(e) => {
                    error!("Preread run failed: {}", e);
                    Err(e.to_string())
                }
            };
            let report = RunReport {
                trigger,
                started_at,
                finished_at,
                outcome,
            };

            let _ = respond_to.send(result);
            let _ = done_tx.send(Finished { report }).await;
        });
    }

    fn set_state(&self, state: JobState) {
        self.status_tx.send_modify(|status| status.state = state);
    }

    fn publish(&self, report: RunReport) {
        info!("Preread run finished: {}", report.describe());
        self.status_tx.send_modify(|status| {
            status.state = JobState::Idle;
            status.last_report = Some(report);
        });
    }
}
