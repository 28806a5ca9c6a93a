#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use mockito::{Matcher, ServerGuard};
use preread::components::credentials::{Credential, CredentialStore, TokenManager};
use preread::components::summarizer::TextGenerator;
use preread::config::{ApiEndpoints, Config, SharedConfig};
use preread::error::{summarizer_error, PrereadResult};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

pub const ACCESS_TOKEN: &str = "test-access-token";
pub const REFRESH_TOKEN: &str = "test-refresh-token";
pub const USER_EMAIL: &str = "me@example.com";

/// Mock provider server, temp directory and a config pointing at both
pub struct TestEnv {
    pub server: ServerGuard,
    pub dir: TempDir,
    pub config: SharedConfig,
    pub store: Arc<CredentialStore>,
}

impl TestEnv {
    pub async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let dir = tempfile::tempdir().expect("temp dir");

        let mut config = Config::with_defaults("client-id", "client-secret", "openai-key");
        config.endpoints = ApiEndpoints::rooted_at(&server.url());
        config.token_path = dir.path().join("token.json");
        config.lock_path = dir.path().join("preread.lock");

        let store = Arc::new(CredentialStore::new(config.token_path.clone()));

        Self {
            server,
            dir,
            config: config.shared(),
            store,
        }
    }

    pub fn token_manager(&self) -> TokenManager {
        TokenManager::new(Arc::clone(&self.config), Arc::clone(&self.store))
    }

    /// Write a credential file the way a previous login would have
    pub fn write_credential(&self, credential: &Credential) {
        let path = self.dir.path().join("token.json");
        std::fs::write(path, serde_json::to_string(credential).expect("json")).expect("write");
    }

    pub fn credential_file(&self) -> Option<Credential> {
        let path = self.dir.path().join("token.json");
        std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| Credential::parse(&raw))
    }
}

/// A credential expiring `expires_in` seconds from now
pub fn credential(access_token: &str, refresh_token: Option<&str>, expires_in: i64) -> Credential {
    Credential {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Some(Utc::now().timestamp() + expires_in),
        token_type: "Bearer".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
        id_token: None,
    }
}

pub fn valid_credential() -> Credential {
    credential(ACCESS_TOKEN, Some(REFRESH_TOKEN), 3600)
}

/// Path matcher that ignores the query string
pub fn path(exact: &str) -> Matcher {
    Matcher::Regex(format!(r"^{}(\?|$)", exact))
}

pub fn bearer() -> String {
    format!("Bearer {}", ACCESS_TOKEN)
}

/// Text generator answering `Summary N` and remembering every prompt
#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail: bool,
    pub gate: Option<Arc<Notify>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Holds every completion until the gate is notified
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts").clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(&self, prompt: &str) -> PrereadResult<String> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail {
            return Err(summarizer_error("model unavailable"));
        }
        let mut prompts = self.prompts.lock().expect("prompts");
        prompts.push(prompt.to_string());
        Ok(format!("  Summary {}  \n", prompts.len()))
    }
}
