use super::digest::{note_error_text, Digest, Preread};
use super::lock::RunLock;
use crate::components::credentials::{CredentialStore, TokenManager};
use crate::components::gmail::{GmailClient, OutgoingMessage};
use crate::components::google_calendar::{CalendarEvent, GoogleCalendarClient};
use crate::components::summarizer::{MeetingContext, OpenAiClient, Summarizer, TextGenerator};
use crate::config::SharedConfig;
use crate::error::PrereadResult;
use crate::utils::time::today_in;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Subjects of recent mail given to the summarizer per meeting
pub const SUBJECT_CONTEXT_LIMIT: usize = 5;

/// How a job run ended
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum JobOutcome {
    Sent {
        subject: String,
        recipient: String,
        message_id: String,
        prereads: Vec<Preread>,
    },
    /// No usable credential, nothing was fetched or sent
    Skipped,
    /// Another run was in progress and this trigger was folded into it
    AlreadyRunning,
}

/// A composed digest that has not been sent
#[derive(Debug, Clone)]
pub struct PreparedDigest {
    pub sender: String,
    pub recipient: String,
    pub digest: Digest,
    pub prereads: Vec<Preread>,
}

/// Calendar → notes → summaries → digest → mail
#[derive(Clone)]
pub struct PrereadPipeline {
    config: SharedConfig,
    token_manager: TokenManager,
    calendar: GoogleCalendarClient,
    gmail: GmailClient,
    summarizer: Summarizer,
}

impl PrereadPipeline {
    pub fn new(
        config: SharedConfig,
        token_manager: TokenManager,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            calendar: GoogleCalendarClient::new(Arc::clone(&config), token_manager.clone()),
            gmail: GmailClient::new(Arc::clone(&config), token_manager.clone()),
            summarizer: Summarizer::new(generator),
            token_manager,
            config,
        }
    }

    /// Production wiring: OpenAI for text generation
    pub fn from_config(config: SharedConfig, store: Arc<CredentialStore>) -> Self {
        let token_manager = TokenManager::new(Arc::clone(&config), store);
        let generator = Arc::new(OpenAiClient::new(Arc::clone(&config)));
        Self::new(config, token_manager, generator)
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    pub fn calendar(&self) -> &GoogleCalendarClient {
        &self.calendar
    }

    /// Today in the configured time zone
    pub async fn today(&self) -> PrereadResult<NaiveDate> {
        let tz = self.config.read().await.tz()?;
        Ok(today_in(&tz))
    }

    /// Build the digest for `day` without sending it.
    ///
    /// `None` when there is no usable credential; in that case no provider is called.
    pub async fn prepare(&self, day: NaiveDate) -> PrereadResult<Option<PreparedDigest>> {
        if self.token_manager.valid_credential().await?.is_none() {
            info!("No valid credential, skipping preread run");
            return Ok(None);
        }

        let events = self.calendar.list_events_for_day(day).await?;
        info!("Fetched {} events for {}", events.len(), day);

        let sender = self.gmail.profile_address().await?;

        let mut prereads = Vec::with_capacity(events.len());
        for event in &events {
            prereads.push(self.preread_for(event, &sender).await?);
        }

        let digest = Digest::compose(&prereads);
        let recipient = {
            let config_read = self.config.read().await;
            config_read
                .digest_recipient
                .clone()
                .unwrap_or_else(|| sender.clone())
        };

        Ok(Some(PreparedDigest {
            sender,
            recipient,
            digest,
            prereads,
        }))
    }

    /// Deliver a prepared digest
    pub async fn send(&self, prepared: PreparedDigest) -> PrereadResult<JobOutcome> {
        let message = OutgoingMessage {
            from: prepared.sender,
            to: prepared.recipient.clone(),
            subject: prepared.digest.subject.clone(),
            body: prepared.digest.body,
        };
        let sent = self.gmail.send_message(&message).await?;
        info!(
            "Email sent: {} to {}",
            prepared.digest.subject, prepared.recipient
        );

        Ok(JobOutcome::Sent {
            subject: prepared.digest.subject,
            recipient: prepared.recipient,
            message_id: sent.id,
            prereads: prepared.prereads,
        })
    }

    /// Full run for `day` under the cross-process run lock
    pub async fn run(&self, day: NaiveDate) -> PrereadResult<JobOutcome> {
        let lock_path = self.config.read().await.lock_path.clone();
        let Some(_lock) = RunLock::try_acquire(&lock_path)? else {
            warn!("Another preread run holds {}", lock_path.display());
            return Ok(JobOutcome::AlreadyRunning);
        };

        match self.prepare(day).await? {
            Some(prepared) => self.send(prepared).await,
            None => Ok(JobOutcome::Skipped),
        }
    }

    pub async fn run_today(&self) -> PrereadResult<JobOutcome> {
        let day = self.today().await?;
        self.run(day).await
    }

    async fn preread_for(&self, event: &CalendarEvent, self_address: &str) -> PrereadResult<Preread> {
        let participants: Vec<String> = event
            .participants()
            .into_iter()
            .filter(|p| !p.eq_ignore_ascii_case(self_address))
            .collect();

        let note = match self.gmail.fetch_note(event.summary.as_deref(), &participants).await {
            Ok(note) => note,
            Err(e) => {
                warn!("Note lookup failed for {}: {}", event.title(), e);
                note_error_text(&e)
            }
        };
        let thread_subjects = self
            .gmail
            .recent_subjects(&participants, SUBJECT_CONTEXT_LIMIT)
            .await;

        let context = MeetingContext::from_event(event, thread_subjects, note.clone());
        let summary = self.summarizer.summarize(&context).await?;

        Ok(Preread {
            event_id: event.id.clone(),
            title: event.title().to_string(),
            start: event.start_raw().to_string(),
            note,
            summary,
        })
    }
}
