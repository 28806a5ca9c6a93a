use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a token is already treated as expired
pub const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// OAuth token material authorizing calendar and mail access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as a unix timestamp in seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Response of the Google token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl Credential {
    /// Parse stored token JSON. Anything unusable counts as no credential.
    pub fn parse(raw: &str) -> Option<Self> {
        let credential: Credential = serde_json::from_str(raw).ok()?;
        if credential.access_token.trim().is_empty() {
            return None;
        }
        Some(credential)
    }

    /// Build a credential from a token endpoint response.
    ///
    /// `previous_refresh_token` is kept when the provider does not issue a new one,
    /// which is the normal case for a refresh grant.
    pub fn from_token_response(
        response: TokenResponse,
        previous_refresh_token: Option<String>,
        now: i64,
    ) -> Self {
        let scopes = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh_token),
            expires_at: Some(now + response.expires_in.unwrap_or(3600)),
            token_type: response.token_type.unwrap_or_else(default_token_type),
            scopes,
            id_token: response.id_token,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - EXPIRY_SKEW_SECS <= now,
            None => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }
}
