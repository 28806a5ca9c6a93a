use serde::Serialize;

pub const DIGEST_SUBJECT: &str = "Daily Meeting Prereads";
pub const DIGEST_DELIMITER: &str = "\n\n---\n\n";
pub const NO_MEETINGS_SUBJECT: &str = "No Meetings Today 😊";
pub const NO_MEETINGS_BODY: &str =
    "You're all clear today! 🎉\n\nNo meetings were found on your calendar.\nEnjoy your day!";

/// Note text used when the note lookup itself failed
pub fn note_error_text(error: &impl std::fmt::Display) -> String {
    format!("Error fetching Granola notes: {}", error)
}

/// One meeting's preread, in fetch order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Preread {
    pub event_id: String,
    pub title: String,
    pub start: String,
    pub note: String,
    pub summary: String,
}

/// Subject and body of the daily mail
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
}

impl Digest {
    pub fn compose(prereads: &[Preread]) -> Self {
        if prereads.is_empty() {
            return Self {
                subject: NO_MEETINGS_SUBJECT.to_string(),
                body: NO_MEETINGS_BODY.to_string(),
            };
        }

        let body = prereads
            .iter()
            .map(|p| p.summary.as_str())
            .collect::<Vec<_>>()
            .join(DIGEST_DELIMITER);

        Self {
            subject: DIGEST_SUBJECT.to_string(),
            body,
        }
    }
}
