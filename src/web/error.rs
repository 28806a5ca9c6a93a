use super::templates::ErrorTemplate;
use crate::error::Error;
use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::{error, warn};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_auth() {
            warn!("Authentication required: {}", self);
            return Redirect::to("/login").into_response();
        }

        let status = match &self {
            Error::OAuth(_) => StatusCode::BAD_REQUEST,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::GoogleCalendar(_) | Error::Gmail(_) | Error::Summarizer(_) | Error::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Request failed: {}", self);

        let page = ErrorTemplate {
            status: status.as_u16(),
            message: self.to_string(),
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, self.to_string()).into_response(),
        }
    }
}
