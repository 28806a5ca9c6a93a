use super::body::{extract_body, truncate_note};
use super::client::{GmailClient, MessageFormat};
use crate::error::PrereadResult;
use tracing::{debug, warn};

/// Note text when no related message exists
pub const NOTE_NOT_FOUND: &str = "No prior Granola notes found.";
/// Note text when the related message body cannot be decoded
pub const NOTE_UNDECODABLE: &str = "Could not decode the prior Granola note.";
/// Prefix of a found note
pub const NOTE_PREFIX: &str = "Prior Granola Note:\n";
/// Messages considered per note search
const NOTE_SEARCH_LIMIT: u32 = 5;
/// Messages looked at per participant for thread context
const SUBJECT_SEARCH_LIMIT: u32 = 5;
pub const INBOX_LABEL: &str = "INBOX";

/// Gmail query for the meeting's Granola notes.
///
/// `"<title>" Granola (from:a OR to:a OR from:b OR to:b)`; the title phrase is
/// left out for untitled meetings and the group for meetings without participants.
pub fn note_query(title: Option<&str>, participants: &[String]) -> String {
    let mut parts = Vec::new();

    if let Some(title) = title.map(|t| t.replace('"', " ")) {
        let title = title.trim();
        if !title.is_empty() {
            parts.push(format!("\"{}\"", title));
        }
    }
    parts.push("Granola".to_string());

    let group = participant_clauses(participants);
    if !group.is_empty() {
        parts.push(format!("({})", group.join(" OR ")));
    }

    parts.join(" ")
}

fn participant_clauses(participants: &[String]) -> Vec<String> {
    participants
        .iter()
        .filter(|p| !p.trim().is_empty())
        .flat_map(|p| [format!("from:{}", p), format!("to:{}", p)])
        .collect()
}

impl GmailClient {
    /// Text of the most recent Granola note for a meeting.
    ///
    /// No match yields [`NOTE_NOT_FOUND`], an undecodable body
    /// [`NOTE_UNDECODABLE`]. Transport errors propagate.
    pub async fn fetch_note(
        &self,
        title: Option<&str>,
        participants: &[String],
    ) -> PrereadResult<String> {
        let query = note_query(title, participants);
        let Some(latest) = self
            .search_latest(&query, &[INBOX_LABEL], NOTE_SEARCH_LIMIT)
            .await?
        else {
            debug!("No Granola note for {:?}", title);
            return Ok(NOTE_NOT_FOUND.to_string());
        };

        let body = self.fetch_body(&latest.id).await?;
        match body {
            Some(body) => Ok(format!("{}{}", NOTE_PREFIX, body)),
            None => Ok(NOTE_UNDECODABLE.to_string()),
        }
    }

    /// Body of a message, preferring plain text, truncated to the note limit.
    ///
    /// `None` when the body cannot be decoded.
    pub async fn fetch_body(&self, id: &str) -> PrereadResult<Option<String>> {
        let message = self.get_message(id, MessageFormat::Full, &[]).await?;
        let Some(payload) = message.payload.as_ref() else {
            return Ok(Some(String::new()));
        };

        match extract_body(payload) {
            Ok(text) => Ok(Some(truncate_note(&text.unwrap_or_default()))),
            Err(e) => {
                warn!("Could not decode body of message {}: {:?}", id, e);
                Ok(None)
            }
        }
    }

    /// Subjects of recent mail exchanged with the participants, at most `limit`.
    ///
    /// Failures are logged per participant and skipped.
    pub async fn recent_subjects(&self, participants: &[String], limit: usize) -> Vec<String> {
        let mut subjects = Vec::new();

        for participant in participants {
            if subjects.len() >= limit {
                break;
            }

            let query = format!("from:{} OR to:{}", participant, participant);
            let found = match self.search(&query, &[], SUBJECT_SEARCH_LIMIT).await {
                Ok(found) => found,
                Err(e) => {
                    warn!("Error fetching Gmail threads for {}: {}", participant, e);
                    continue;
                }
            };

            for message_ref in found {
                if subjects.len() >= limit {
                    break;
                }
                match self
                    .get_message(&message_ref.id, MessageFormat::Metadata, &["Subject"])
                    .await
                {
                    Ok(message) => {
                        if let Some(subject) = message.subject() {
                            subjects.push(subject.to_string());
                        }
                    }
                    Err(e) => {
                        warn!("Error fetching Gmail message {}: {}", message_ref.id, e);
                    }
                }
            }
        }

        subjects
    }
}
