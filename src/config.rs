use crate::error::{config_error, env_error, PrereadResult};
use crate::utils::time::parse_time;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Redirect target used when `GOOGLE_REDIRECT_URI` is not set (local dashboard)
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8501/auth_callback";
/// Model used for the prereads
pub const DEFAULT_MODEL: &str = "gpt-4o";
/// Daily run time in HH:MM
pub const DEFAULT_DAILY_RUN_TIME: &str = "06:00";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_TOKEN_PATH: &str = "token.json";
pub const DEFAULT_LOCK_PATH: &str = "preread.lock";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8501";
/// Optional file with non-secret settings
pub const SETTINGS_FILE: &str = "config/preread.toml";

/// Configuration shared between the dashboard, the job and the API clients
pub type SharedConfig = Arc<RwLock<Config>>;

/// Base URLs of every external API the application talks to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEndpoints {
    /// Google OAuth consent page
    pub auth_url: String,
    /// Google OAuth token endpoint
    pub token_url: String,
    /// Google OAuth revocation endpoint
    pub revoke_url: String,
    /// Google Calendar v3 root
    pub calendar_base: String,
    /// Gmail v1 root
    pub gmail_base: String,
    /// OpenAI v1 root
    pub openai_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            calendar_base: "https://www.googleapis.com/calendar/v3".to_string(),
            gmail_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            openai_base: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Point every endpoint at a single host, keeping the provider paths
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/o/oauth2/auth", base),
            token_url: format!("{}/token", base),
            revoke_url: format!("{}/revoke", base),
            calendar_base: format!("{}/calendar/v3", base),
            gmail_base: format!("{}/gmail/v1", base),
            openai_base: format!("{}/v1", base),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// OAuth redirect URI registered for the client
    pub redirect_uri: String,
    /// Calendar to read events from
    pub google_calendar_id: String,
    /// OpenAI API key
    pub openai_api_key: String,
    /// Chat completion model
    pub openai_model: String,
    /// Time of the daily run (HH:MM)
    pub daily_run_time: String,
    /// IANA time zone that defines "today" and the daily run time
    pub timezone: String,
    /// Credential file
    pub token_path: PathBuf,
    /// Run lock shared by every process that can send the digest
    pub lock_path: PathBuf,
    /// Digest recipient, defaults to the authenticated address
    pub digest_recipient: Option<String>,
    /// Dashboard listen address
    pub bind_address: String,
    /// External API endpoints
    pub endpoints: ApiEndpoints,
}

/// Settings that may come from `config/preread.toml`
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    google_calendar_id: Option<String>,
    openai_model: Option<String>,
    daily_run_time: Option<String>,
    timezone: Option<String>,
    token_path: Option<PathBuf>,
    lock_path: Option<PathBuf>,
    digest_recipient: Option<String>,
    bind_address: Option<String>,
}

impl Config {
    /// Configuration with every optional value at its default
    pub fn with_defaults(
        google_client_id: impl Into<String>,
        google_client_secret: impl Into<String>,
        openai_api_key: impl Into<String>,
    ) -> Self {
        Self {
            google_client_id: google_client_id.into(),
            google_client_secret: google_client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            google_calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            openai_api_key: openai_api_key.into(),
            openai_model: DEFAULT_MODEL.to_string(),
            daily_run_time: DEFAULT_DAILY_RUN_TIME.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
            digest_recipient: None,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            endpoints: ApiEndpoints::default(),
        }
    }

    /// Load configuration from environment and config file
    pub fn load() -> PrereadResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Required environment variables
        let google_client_id =
            env::var("GOOGLE_CLIENT_ID").map_err(|_| env_error("GOOGLE_CLIENT_ID"))?;
        let google_client_secret =
            env::var("GOOGLE_CLIENT_SECRET").map_err(|_| env_error("GOOGLE_CLIENT_SECRET"))?;
        let openai_api_key =
            env::var("OPENAI_API_KEY").map_err(|_| env_error("OPENAI_API_KEY"))?;

        let mut config = Self::with_defaults(google_client_id, google_client_secret, openai_api_key);

        if let Some(settings) = read_settings_file(Path::new(SETTINGS_FILE))? {
            config.apply_file_settings(settings);
        }
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Wrap the configuration for sharing between tasks
    pub fn shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }

    /// Parsed time zone
    pub fn tz(&self) -> PrereadResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown time zone: {}", self.timezone)))
    }

    /// Parsed daily run time as (hour, minute)
    pub fn run_time(&self) -> PrereadResult<(u32, u32)> {
        parse_time(&self.daily_run_time).ok_or_else(|| {
            config_error(&format!(
                "DAILY_RUN_TIME must be HH:MM, got {}",
                self.daily_run_time
            ))
        })
    }

    /// Check the values that are parsed later on
    pub fn validate(&self) -> PrereadResult<()> {
        self.tz()?;
        self.run_time()?;
        if self.redirect_uri.parse::<url::Url>().is_err() {
            return Err(config_error(&format!(
                "GOOGLE_REDIRECT_URI is not a valid URL: {}",
                self.redirect_uri
            )));
        }
        Ok(())
    }

    fn apply_file_settings(&mut self, settings: FileSettings) {
        if let Some(value) = settings.google_calendar_id {
            self.google_calendar_id = value;
        }
        if let Some(value) = settings.openai_model {
            self.openai_model = value;
        }
        if let Some(value) = settings.daily_run_time {
            self.daily_run_time = value;
        }
        if let Some(value) = settings.timezone {
            self.timezone = value;
        }
        if let Some(value) = settings.token_path {
            self.token_path = value;
        }
        if let Some(value) = settings.lock_path {
            self.lock_path = value;
        }
        if settings.digest_recipient.is_some() {
            self.digest_recipient = settings.digest_recipient;
        }
        if let Some(value) = settings.bind_address {
            self.bind_address = value;
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("GOOGLE_REDIRECT_URI") {
            self.redirect_uri = value;
        }
        if let Ok(value) = env::var("GOOGLE_CALENDAR_ID") {
            self.google_calendar_id = value;
        }
        if let Ok(value) = env::var("OPENAI_MODEL") {
            self.openai_model = value;
        }
        if let Ok(value) = env::var("DAILY_RUN_TIME") {
            self.daily_run_time = value;
        }
        if let Ok(value) = env::var("TIMEZONE") {
            self.timezone = value;
        }
        if let Ok(value) = env::var("TOKEN_PATH") {
            self.token_path = PathBuf::from(value);
        }
        if let Ok(value) = env::var("RUN_LOCK_PATH") {
            self.lock_path = PathBuf::from(value);
        }
        if let Ok(value) = env::var("DIGEST_RECIPIENT") {
            if !value.trim().is_empty() {
                self.digest_recipient = Some(value.trim().to_string());
            }
        }
        if let Ok(value) = env::var("BIND_ADDRESS") {
            self.bind_address = value;
        }
    }
}

/// Read the optional settings file; a missing file is not an error
fn read_settings_file(path: &Path) -> PrereadResult<Option<FileSettings>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(toml::from_str::<FileSettings>(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
