use super::templates::{
    DashboardTemplate, EventView, LoginTemplate, PrereadView, PreviewTemplate,
};
use super::{AppState, CSRF_COOKIE, STATE_COOKIE};
use crate::components::google_calendar::time::get_event_start;
use crate::components::google_calendar::CalendarEvent;
use crate::components::preread_job::{JobOutcome, JobState, Preread, Trigger};
use crate::error::{forbidden_error, oauth_error, PrereadResult};
use askama::Template;
use axum::extract::{Form, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Query of the OAuth redirect
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Body of the dashboard's POST forms
#[derive(Debug, Deserialize)]
pub struct ActionForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Today's events and the job state, or the login page
pub async fn index_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> PrereadResult<Response> {
    if state.pipeline.token_manager().valid_credential().await?.is_none() {
        return Ok(Html(LoginTemplate {}.render()?).into_response());
    }

    let tz = state.config.read().await.tz()?;
    let day = state.pipeline.today().await?;
    let events = state.pipeline.calendar().list_events_for_day(day).await?;
    let status = state.job.status();

    let (has_report, report_line, report_time, report_prereads) = match &status.last_report {
        Some(report) => {
            let prereads = match &report.outcome {
                Ok(JobOutcome::Sent { prereads, .. }) => preread_views(prereads),
                _ => Vec::new(),
            };
            (
                true,
                format!("{} run: {}", report.trigger, report.describe()),
                report
                    .finished_at
                    .with_timezone(&tz)
                    .format("%Y-%m-%d %H:%M:%S %Z")
                    .to_string(),
                prereads,
            )
        }
        None => (false, String::new(), String::new(), Vec::new()),
    };

    let (jar, csrf_token) = issue_csrf_token(jar);
    let page = DashboardTemplate {
        day: day.format("%A %Y-%m-%d").to_string(),
        timezone: tz.name().to_string(),
        events: events.iter().map(|e| event_view(e, &tz)).collect(),
        running: status.state == JobState::Running,
        has_report,
        report_line,
        report_time,
        report_prereads,
        csrf_token,
    };
    Ok((jar, Html(page.render()?)).into_response())
}

/// Start the OAuth flow with a fresh `state`
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> PrereadResult<impl IntoResponse> {
    let oauth_state = Uuid::new_v4().to_string();
    let url = state.pipeline.token_manager().authorization_url(&oauth_state).await?;

    let cookie = Cookie::build((STATE_COOKIE, oauth_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::to(url.as_str())))
}

/// OAuth redirect target
pub async fn auth_callback_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> PrereadResult<impl IntoResponse> {
    if let Some(error) = params.error {
        return Err(oauth_error(&format!("Consent was not granted: {}", error)));
    }

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(received)) if !expected.is_empty() && expected == received => {}
        _ => {
            warn!("OAuth callback with mismatched state");
            return Err(oauth_error("State mismatch, start the login again"));
        }
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| oauth_error("Missing authorization code"))?;

    state.pipeline.token_manager().exchange_code(&code).await?;
    info!("Logged in through the dashboard");

    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));
    Ok((jar, Redirect::to("/")))
}

/// Manual "run now"
pub async fn run_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> PrereadResult<Redirect> {
    check_csrf_token(&jar, &form)?;
    match state.job.trigger(Trigger::Manual).await? {
        JobOutcome::Skipped => Ok(Redirect::to("/login")),
        _ => Ok(Redirect::to("/")),
    }
}

/// Today's digest without sending it
pub async fn preview_handler(State(state): State<AppState>) -> PrereadResult<Response> {
    let day = state.pipeline.today().await?;
    let Some(prepared) = state.pipeline.prepare(day).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    let page = PreviewTemplate {
        day: day.format("%A %Y-%m-%d").to_string(),
        subject: prepared.digest.subject,
        recipient: prepared.recipient,
        prereads: preread_views(&prepared.prereads),
        body: prepared.digest.body,
    };
    Ok(Html(page.render()?).into_response())
}

/// Revoke the credential and forget it
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ActionForm>,
) -> PrereadResult<Redirect> {
    check_csrf_token(&jar, &form)?;
    state.pipeline.token_manager().revoke().await?;
    info!("Logged out");
    Ok(Redirect::to("/"))
}

pub async fn health_handler() -> &'static str {
    "OK"
}

/// Reuse the browser's form token or mint one
fn issue_csrf_token(jar: CookieJar) -> (CookieJar, String) {
    if let Some(existing) = jar.get(CSRF_COOKIE).map(|c| c.value().to_string()) {
        if !existing.is_empty() {
            return (jar, existing);
        }
    }

    let token = Uuid::new_v4().to_string();
    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    (jar.add(cookie), token)
}

/// The posted token must match the cookie set by the dashboard
fn check_csrf_token(jar: &CookieJar, form: &ActionForm) -> PrereadResult<()> {
    match jar.get(CSRF_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() && cookie.value() == form.csrf_token => Ok(()),
        _ => {
            warn!("Dashboard form posted without a matching token");
            Err(forbidden_error("Form token mismatch, reload the dashboard"))
        }
    }
}

fn event_view(event: &CalendarEvent, tz: &Tz) -> EventView {
    let time = if event.is_all_day() {
        "All day".to_string()
    } else {
        match get_event_start(event, tz) {
            Ok(Some(start)) => start.format("%H:%M").to_string(),
            _ => event.start_raw().to_string(),
        }
    };

    EventView {
        time,
        title: event.title().to_string(),
        attendees: event.participants().join(", "),
    }
}

fn preread_views(prereads: &[Preread]) -> Vec<PrereadView> {
    prereads
        .iter()
        .map(|p| PrereadView {
            title: p.title.clone(),
            start: p.start.clone(),
            summary: p.summary.clone(),
        })
        .collect()
}
