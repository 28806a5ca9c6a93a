use super::actor::{JobActor, JobCommand, JobStatus, Trigger};
use super::pipeline::{JobOutcome, PrereadPipeline};
use crate::error::{job_error, PrereadResult};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

/// Handle for interacting with the preread job actor
#[derive(Clone)]
pub struct JobHandle {
    command_tx: mpsc::Sender<JobCommand>,
    status_rx: watch::Receiver<JobStatus>,
    actor_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl JobHandle {
    /// Create the actor and spawn its loop
    pub fn spawn(pipeline: PrereadPipeline) -> Self {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(JobStatus::default());

        let actor = JobActor::new(pipeline, command_rx, status_tx);
        let actor_task = tokio::spawn(actor.run());

        Self {
            command_tx,
            status_rx,
            actor_task: Arc::new(Mutex::new(Some(actor_task))),
        }
    }

    /// Request a run and wait for its outcome
    pub async fn trigger(&self, trigger: Trigger) -> PrereadResult<JobOutcome> {
        let (respond_to, response) = oneshot::channel();
        self.command_tx
            .send(JobCommand::Run {
                trigger,
                respond_to,
            })
            .await
            .map_err(|e| job_error(&format!("Actor mailbox error: {}", e)))?;

        response
            .await
            .map_err(|_| job_error("Response channel closed"))?
    }

    /// Current state and last report
    pub fn status(&self) -> JobStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver that wakes on every state change
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status_rx.clone()
    }

    /// Stop the actor, waiting for an in-flight run to complete
    pub async fn shutdown(&self) -> PrereadResult<()> {
        let _ = self.command_tx.send(JobCommand::Shutdown).await;
        if let Some(task) = self.actor_task.lock().await.take() {
            task.await
                .map_err(|e| job_error(&format!("Job actor panicked: {}", e)))?;
        }
        Ok(())
    }
}
