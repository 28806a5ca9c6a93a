use crate::components::google_calendar::CalendarEvent;

/// Headings every preread is structured under
pub const PREREAD_SECTIONS: [&str; 4] = ["Objective", "Key Context", "Questions / Decisions", "Logistics"];

const NONE_LISTED: &str = "None";

/// Everything the summarizer knows about one meeting
#[derive(Debug, Clone, Default)]
pub struct MeetingContext {
    pub title: String,
    pub start: String,
    pub attendees: Vec<String>,
    pub thread_subjects: Vec<String>,
    pub note: String,
}

impl MeetingContext {
    pub fn from_event(event: &CalendarEvent, thread_subjects: Vec<String>, note: String) -> Self {
        Self {
            title: event.title().to_string(),
            start: event.start_raw().to_string(),
            attendees: event.participants(),
            thread_subjects,
            note,
        }
    }
}

/// Render the preread request for one meeting
pub fn build_prompt(context: &MeetingContext) -> String {
    let attendees = if context.attendees.is_empty() {
        NONE_LISTED.to_string()
    } else {
        context.attendees.join(", ")
    };
    let subjects = if context.thread_subjects.is_empty() {
        NONE_LISTED.to_string()
    } else {
        context.thread_subjects.join("\n")
    };
    let start = if context.start.is_empty() {
        "Unknown"
    } else {
        context.start.as_str()
    };

    format!(
        "You are an executive assistant. Create a concise, actionable preread for the following meeting.\n\
         MEETING TITLE: {title}\n\
         START: {start}\n\
         ATTENDEES: {attendees}\n\
         EMAIL THREAD CONTEXT (subjects only):\n\
         {subjects}\n\
         ADDITIONAL NOTES:\n\
         {note}\n\
         \n\
         Structure the preread in bullets under the headings: {sections}.\n",
        title = context.title,
        start = start,
        attendees = attendees,
        subjects = subjects,
        note = context.note,
        sections = PREREAD_SECTIONS.join(", "),
    )
}
