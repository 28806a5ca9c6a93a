use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(preread::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(preread::config))]
    Config(String),

    #[error("Authentication required: {0}")]
    #[diagnostic(
        code(preread::auth),
        help("Log in again from the dashboard or run `get_google_token`")
    )]
    Unauthenticated(String),

    #[error("Google OAuth error: {0}")]
    #[diagnostic(code(preread::oauth))]
    OAuth(String),

    #[error("Request rejected: {0}")]
    #[diagnostic(code(preread::forbidden))]
    Forbidden(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(preread::google_calendar))]
    GoogleCalendar(String),

    #[error("Gmail API error: {0}")]
    #[diagnostic(code(preread::gmail))]
    Gmail(String),

    #[error("Text generation error: {0}")]
    #[diagnostic(code(preread::summarizer))]
    Summarizer(String),

    #[error("Job error: {0}")]
    #[diagnostic(code(preread::job))]
    Job(String),

    #[error(transparent)]
    #[diagnostic(code(preread::io))]
    Io(#[from] std::io::Error),

    #[error("HTTP transport error: {0}")]
    #[diagnostic(code(preread::http))]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(preread::serialization))]
    Serialization(String),

    #[error("Template error: {0}")]
    #[diagnostic(code(preread::template))]
    Template(#[from] askama::Error),

    #[error("Other error: {0}")]
    #[diagnostic(code(preread::other))]
    Other(String),
}

impl Error {
    /// Whether the error means the user has to log in again
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthenticated(_))
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type PrereadResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create authentication errors
pub fn auth_error(message: &str) -> Error {
    Error::Unauthenticated(message.to_string())
}

/// Helper to create OAuth errors
pub fn oauth_error(message: &str) -> Error {
    Error::OAuth(message.to_string())
}

/// Helper to create forbidden-request errors
pub fn forbidden_error(message: &str) -> Error {
    Error::Forbidden(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create Gmail errors
pub fn gmail_error(message: &str) -> Error {
    Error::Gmail(message.to_string())
}

/// Helper to create summarizer errors
pub fn summarizer_error(message: &str) -> Error {
    Error::Summarizer(message.to_string())
}

/// Helper to create job errors
pub fn job_error(message: &str) -> Error {
    Error::Job(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
