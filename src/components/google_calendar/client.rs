use super::models::{CalendarEvent, EventsPage};
use super::time::get_event_start;
use crate::components::credentials::TokenManager;
use crate::config::SharedConfig;
use crate::error::{google_calendar_error, PrereadResult};
use crate::utils::time::day_bounds;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

/// Largest page the Calendar API accepts
const PAGE_SIZE: &str = "250";

/// Read-only Google Calendar access
#[derive(Clone)]
pub struct GoogleCalendarClient {
    config: SharedConfig,
    token_manager: TokenManager,
    client: Client,
}

impl GoogleCalendarClient {
    pub fn new(config: SharedConfig, token_manager: TokenManager) -> Self {
        Self {
            config,
            token_manager,
            client: Client::new(),
        }
    }

    /// Events whose start falls in [local midnight, next local midnight) of `date`,
    /// ordered by start time
    pub async fn list_events_for_day(&self, date: NaiveDate) -> PrereadResult<Vec<CalendarEvent>> {
        let (calendar_base, calendar_id, tz) = {
            let config_read = self.config.read().await;
            (
                config_read.endpoints.calendar_base.clone(),
                config_read.google_calendar_id.clone(),
                config_read.tz()?,
            )
        };
        let (day_start, day_end) = day_bounds(&tz, date)?;

        // Get authentication token
        let access_token = self.token_manager.access_token().await?;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .fetch_page(
                    &calendar_base,
                    &calendar_id,
                    &access_token,
                    &day_start,
                    &day_end,
                    page_token.as_deref(),
                )
                .await?;

            events.extend(page.items.into_iter().map(CalendarEvent::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let events = order_within_day(events, &tz, &day_start, &day_end);
        info!("Fetched {} events for {}", events.len(), date);
        Ok(events)
    }

    async fn fetch_page(
        &self,
        calendar_base: &str,
        calendar_id: &str,
        access_token: &str,
        day_start: &DateTime<Tz>,
        day_end: &DateTime<Tz>,
        page_token: Option<&str>,
    ) -> PrereadResult<EventsPage> {
        let mut url = Url::parse(calendar_base)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar base URL cannot have a path"))?
            .pop_if_empty()
            .extend(&["calendars", calendar_id, "events"]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("timeMin", &day_start.to_rfc3339());
            query.append_pair("timeMax", &day_end.to_rfc3339());
            query.append_pair("singleEvents", "true");
            query.append_pair("orderBy", "startTime");
            query.append_pair("maxResults", PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        // Make API request
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json::<EventsPage>()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))
    }
}

/// Drop events that started outside the day and sort the rest by start.
///
/// The API returns everything overlapping the range, including meetings that
/// began the day before. Events whose start cannot be parsed stay where the
/// provider put them.
fn order_within_day(
    events: Vec<CalendarEvent>,
    tz: &Tz,
    day_start: &DateTime<Tz>,
    day_end: &DateTime<Tz>,
) -> Vec<CalendarEvent> {
    let mut keyed = Vec::with_capacity(events.len());
    let mut last_key = *day_start;

    for event in events {
        match get_event_start(&event, tz) {
            Ok(Some(start)) => {
                if start < *day_start || start >= *day_end {
                    debug!("Skipping event {} starting outside the day", event.id);
                    continue;
                }
                last_key = start;
                keyed.push((start, event));
            }
            Ok(None) | Err(_) => {
                debug!("Keeping event {} with unreadable start", event.id);
                keyed.push((last_key, event));
            }
        }
    }

    keyed.sort_by_key(|(start, _)| *start);
    keyed.into_iter().map(|(_, event)| event).collect()
}
