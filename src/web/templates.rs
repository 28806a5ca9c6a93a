use askama::Template;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {}

/// A calendar entry as listed on the dashboard
pub struct EventView {
    pub time: String,
    pub title: String,
    pub attendees: String,
}

pub struct PrereadView {
    pub title: String,
    pub start: String,
    pub summary: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub day: String,
    pub timezone: String,
    pub events: Vec<EventView>,
    pub running: bool,
    pub has_report: bool,
    pub report_line: String,
    pub report_time: String,
    pub report_prereads: Vec<PrereadView>,
    pub csrf_token: String,
}

#[derive(Template)]
#[template(path = "preview.html")]
pub struct PreviewTemplate {
    pub day: String,
    pub subject: String,
    pub recipient: String,
    pub prereads: Vec<PrereadView>,
    pub body: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: String,
}
