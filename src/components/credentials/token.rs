use super::models::{Credential, TokenResponse};
use super::store::CredentialStore;
use crate::config::SharedConfig;
use crate::error::{auth_error, oauth_error, PrereadResult};
use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use url::Url;

/// Scopes requested at login
pub const SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
];

/// OAuth lifecycle on top of the credential store: login, refresh, revocation
#[derive(Clone)]
pub struct TokenManager {
    config: SharedConfig,
    store: Arc<CredentialStore>,
    client: Client,
    refresh_lock: Arc<Mutex<()>>,
}

impl TokenManager {
    pub fn new(config: SharedConfig, store: Arc<CredentialStore>) -> Self {
        Self {
            config,
            store,
            client: Client::new(),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Consent page URL for the authorization-code flow
    pub async fn authorization_url(&self, state: &str) -> PrereadResult<Url> {
        let (auth_url, client_id, redirect_uri) = {
            let config_read = self.config.read().await;
            (
                config_read.endpoints.auth_url.clone(),
                config_read.google_client_id.clone(),
                config_read.redirect_uri.clone(),
            )
        };

        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            &auth_url,
            &[
                ("client_id", client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
        .map_err(|e| oauth_error(&format!("Failed to build authorization URL: {}", e)))
    }

    /// Exchange an authorization code for a credential and store it
    pub async fn exchange_code(&self, code: &str) -> PrereadResult<Credential> {
        let (client_id, client_secret, redirect_uri) = {
            let config_read = self.config.read().await;
            (
                config_read.google_client_id.clone(),
                config_read.google_client_secret.clone(),
                config_read.redirect_uri.clone(),
            )
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code".to_string()),
        ];

        let response = self.post_token_form(&params).await?;
        let token = match response {
            TokenReply::Issued(token) => token,
            TokenReply::Rejected(status, body) => {
                return Err(oauth_error(&format!(
                    "Failed to exchange authorization code: HTTP {} - {}",
                    status, body
                )));
            }
        };

        let credential = Credential::from_token_response(token, None, Utc::now().timestamp());
        if !credential.can_refresh() {
            warn!("Google did not issue a refresh token; a new login will be needed when the access token expires");
        }

        self.store.store(&credential).await?;
        info!("Google credential stored");
        Ok(credential)
    }

    /// Current credential, refreshed if needed. `None` means a login is required.
    pub async fn valid_credential(&self) -> PrereadResult<Option<Credential>> {
        let Some(credential) = self.store.load().await else {
            return Ok(None);
        };

        if !credential.is_expired() {
            return Ok(Some(credential));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        let Some(credential) = self.store.load().await else {
            return Ok(None);
        };
        if !credential.is_expired() {
            return Ok(Some(credential));
        }

        if !credential.can_refresh() {
            info!("Google credential expired and cannot be refreshed");
            return Ok(None);
        }

        self.refresh(&credential).await
    }

    /// Bearer token for API calls
    pub async fn access_token(&self) -> PrereadResult<String> {
        self.valid_credential()
            .await?
            .map(|credential| credential.access_token)
            .ok_or_else(|| auth_error("No valid Google credential, please log in"))
    }

    /// Refresh an expired credential
    async fn refresh(&self, credential: &Credential) -> PrereadResult<Option<Credential>> {
        let refresh_token = credential.refresh_token.clone().unwrap_or_default();

        let (client_id, client_secret) = {
            let config_read = self.config.read().await;
            (
                config_read.google_client_id.clone(),
                config_read.google_client_secret.clone(),
            )
        };

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token.clone()),
            ("grant_type", "refresh_token".to_string()),
        ];

        let token = match self.post_token_form(&params).await? {
            TokenReply::Issued(token) => token,
            TokenReply::Rejected(status, body) if is_invalid_grant(status, &body) => {
                // The grant was revoked or has expired
                warn!(
                    "Google rejected the refresh token (HTTP {}): {}; clearing stored credential",
                    status, body
                );
                self.store.clear().await?;
                return Ok(None);
            }
            TokenReply::Rejected(status, body) => {
                return Err(oauth_error(&format!(
                    "Failed to refresh token: HTTP {} - {}",
                    status, body
                )));
            }
        };

        let mut refreshed =
            Credential::from_token_response(token, Some(refresh_token), Utc::now().timestamp());
        if refreshed.scopes.is_empty() {
            refreshed.scopes = credential.scopes.clone();
        }
        if refreshed.id_token.is_none() {
            refreshed.id_token = credential.id_token.clone();
        }

        self.store.store(&refreshed).await?;
        info!("Google credential refreshed");
        Ok(Some(refreshed))
    }

    /// Revoke the grant at Google and forget the credential locally
    pub async fn revoke(&self) -> PrereadResult<()> {
        let result = match self.store.load().await {
            Some(credential) => {
                let token = credential
                    .refresh_token
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or(credential.access_token);
                self.post_revoke(&token).await
            }
            None => Ok(()),
        };

        // Local state is dropped even when Google could not be reached
        self.store.clear().await?;
        info!("Google credential cleared");
        result
    }

    async fn post_revoke(&self, token: &str) -> PrereadResult<()> {
        let revoke_url = {
            let config_read = self.config.read().await;
            config_read.endpoints.revoke_url.clone()
        };

        let response = self
            .client
            .post(revoke_url)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| oauth_error(&format!("Failed to revoke token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(oauth_error(&format!(
                "Failed to revoke token: HTTP {} - {}",
                status, error_body
            )));
        }

        Ok(())
    }

    async fn post_token_form(&self, params: &[(&str, String)]) -> PrereadResult<TokenReply> {
        let token_url = {
            let config_read = self.config.read().await;
            config_read.endpoints.token_url.clone()
        };

        let response = self
            .client
            .post(token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| oauth_error(&format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Ok(TokenReply::Rejected(status.as_u16(), error_body));
        }
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(oauth_error(&format!(
                "Token request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| oauth_error(&format!("Failed to parse token response: {}", e)))?;
        Ok(TokenReply::Issued(token))
    }
}

enum TokenReply {
    Issued(TokenResponse),
    Rejected(u16, String),
}

/// Only `400 invalid_grant` means the refresh token itself is dead
fn is_invalid_grant(status: u16, body: &str) -> bool {
    if status != 400 {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .is_some_and(|error| error == "invalid_grant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_invalid_grant() {
        assert!(is_invalid_grant(400, r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#));
        assert!(!is_invalid_grant(401, r#"{"error": "invalid_client"}"#));
        assert!(!is_invalid_grant(400, r#"{"error": "invalid_request"}"#));
        assert!(!is_invalid_grant(429, "Too Many Requests"));
        assert!(!is_invalid_grant(400, "not json"));
    }
}
