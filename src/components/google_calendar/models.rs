use serde::{Deserialize, Serialize};

/// Title used when the provider sends an event without a summary
pub const UNTITLED_EVENT: &str = "No Title";

/// One page of `events.list`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Event resource as returned by the Calendar API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
    #[serde(default)]
    pub start: Option<ApiEventTime>,
    #[serde(default)]
    pub end: Option<ApiEventTime>,
    #[serde(default)]
    pub attendees: Vec<ApiAttendee>,
    #[serde(default)]
    pub creator: Option<ApiPerson>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAttendee {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPerson {
    #[serde(default)]
    pub email: Option<String>,
}

/// Simplified calendar event representation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub html_link: Option<String>,
    pub start_date_time: Option<String>,
    pub start_date: Option<String>,
    pub end_date_time: Option<String>,
    pub end_date: Option<String>,
    pub attendees: Vec<String>,
    pub creator: Option<String>,
}

impl From<ApiEvent> for CalendarEvent {
    fn from(event: ApiEvent) -> Self {
        let start = event.start.unwrap_or_default();
        let end = event.end.unwrap_or_default();

        Self {
            id: event.id,
            summary: event.summary.filter(|s| !s.trim().is_empty()),
            description: event.description,
            html_link: event.html_link,
            start_date_time: start.date_time,
            start_date: start.date,
            end_date_time: end.date_time,
            end_date: end.date,
            attendees: event
                .attendees
                .into_iter()
                .filter_map(|a| a.email)
                .filter(|e| !e.trim().is_empty())
                .collect(),
            creator: event.creator.and_then(|c| c.email),
        }
    }
}

impl CalendarEvent {
    /// Title for display and prompts
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or(UNTITLED_EVENT)
    }

    /// Start exactly as the provider sent it: `dateTime`, else the all-day `date`
    pub fn start_raw(&self) -> &str {
        self.start_date_time
            .as_deref()
            .or(self.start_date.as_deref())
            .unwrap_or("")
    }

    pub fn is_all_day(&self) -> bool {
        self.start_date_time.is_none() && self.start_date.is_some()
    }

    /// Attendee emails followed by the creator, first occurrence wins
    pub fn participants(&self) -> Vec<String> {
        let mut participants: Vec<String> = Vec::new();
        for email in self.attendees.iter().chain(self.creator.iter()) {
            if !participants.iter().any(|p| p.eq_ignore_ascii_case(email)) {
                participants.push(email.clone());
            }
        }
        participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_event_maps_with_defaults() {
        let api: ApiEvent = serde_json::from_str(
            r#"{
                "id": "evt1",
                "start": {"dateTime": "2025-01-01T09:00:00+02:00"},
                "attendees": [{"email": "a@x.com"}, {"displayName": "Room 1"}],
                "creator": {"email": "b@x.com"}
            }"#,
        )
        .unwrap();
        let event = CalendarEvent::from(api);

        assert_eq!(event.title(), UNTITLED_EVENT);
        assert_eq!(event.start_raw(), "2025-01-01T09:00:00+02:00");
        assert_eq!(event.attendees, vec!["a@x.com".to_string()]);
        assert_eq!(event.creator.as_deref(), Some("b@x.com"));
        assert!(!event.is_all_day());
    }

    #[test]
    fn participants_are_deduplicated_in_order() {
        let event = CalendarEvent {
            attendees: vec![
                "b@x.com".to_string(),
                "a@x.com".to_string(),
                "B@x.com".to_string(),
            ],
            creator: Some("a@x.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            event.participants(),
            vec!["b@x.com".to_string(), "a@x.com".to_string()]
        );
    }

    #[test]
    fn all_day_start_falls_back_to_date() {
        let event = CalendarEvent {
            start_date: Some("2025-01-01".to_string()),
            ..Default::default()
        };
        assert!(event.is_all_day());
        assert_eq!(event.start_raw(), "2025-01-01");
    }
}
