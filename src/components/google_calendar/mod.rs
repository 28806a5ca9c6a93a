mod client;
pub mod models;
pub mod time;

pub use client::GoogleCalendarClient;
pub use models::CalendarEvent;
