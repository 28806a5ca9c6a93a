use super::mime::OutgoingMessage;
use super::models::{Message, MessageList, MessageRef, Profile, RawMessage, SentMessage};
use crate::components::credentials::TokenManager;
use crate::config::SharedConfig;
use crate::error::{gmail_error, PrereadResult};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

/// Detail level of `users.messages.get`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Full,
    Metadata,
}

impl MessageFormat {
    fn as_str(self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
        }
    }
}

/// Gmail access for the authenticated user (`users/me`)
#[derive(Clone)]
pub struct GmailClient {
    config: SharedConfig,
    token_manager: TokenManager,
    client: Client,
}

impl GmailClient {
    pub fn new(config: SharedConfig, token_manager: TokenManager) -> Self {
        Self {
            config,
            token_manager,
            client: Client::new(),
        }
    }

    /// Message ids matching a Gmail search query, newest first
    pub async fn search(
        &self,
        query: &str,
        label_ids: &[&str],
        max_results: u32,
    ) -> PrereadResult<Vec<MessageRef>> {
        let mut url = self.user_url(&["messages"]).await?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            pairs.append_pair("maxResults", &max_results.to_string());
            for label in label_ids {
                pairs.append_pair("labelIds", label);
            }
        }

        debug!("Searching Gmail: {}", query);
        let list: MessageList = self.get_json(url, "search messages").await?;
        Ok(list.messages)
    }

    /// Most recent message matching the query
    pub async fn search_latest(
        &self,
        query: &str,
        label_ids: &[&str],
        max_results: u32,
    ) -> PrereadResult<Option<MessageRef>> {
        Ok(self
            .search(query, label_ids, max_results)
            .await?
            .into_iter()
            .next())
    }

    /// Fetch one message; `metadata_headers` only applies to the metadata format
    pub async fn get_message(
        &self,
        id: &str,
        format: MessageFormat,
        metadata_headers: &[&str],
    ) -> PrereadResult<Message> {
        let mut url = self.user_url(&["messages", id]).await?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", format.as_str());
            if format == MessageFormat::Metadata {
                for header in metadata_headers {
                    pairs.append_pair("metadataHeaders", header);
                }
            }
        }

        self.get_json(url, "fetch message").await
    }

    /// Address of the authenticated user
    pub async fn profile_address(&self) -> PrereadResult<String> {
        let url = self.user_url(&["profile"]).await?;
        let profile: Profile = self.get_json(url, "fetch profile").await?;
        Ok(profile.email_address)
    }

    /// Submit a message through `users.messages.send`
    pub async fn send_message(&self, message: &OutgoingMessage) -> PrereadResult<SentMessage> {
        let url = self.user_url(&["messages", "send"]).await?;
        let access_token = self.token_manager.access_token().await?;

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&RawMessage {
                raw: message.to_raw(),
            })
            .send()
            .await
            .map_err(|e| gmail_error(&format!("Failed to send message: {}", e)))?;

        let response = check_response(response, "send message").await?;
        let sent: SentMessage = response
            .json()
            .await
            .map_err(|e| gmail_error(&format!("Failed to parse send response: {}", e)))?;

        info!("Gmail accepted message id {}", sent.id);
        Ok(sent)
    }

    async fn user_url(&self, segments: &[&str]) -> PrereadResult<Url> {
        let gmail_base = {
            let config_read = self.config.read().await;
            config_read.endpoints.gmail_base.clone()
        };

        let mut url = Url::parse(&gmail_base)
            .map_err(|e| gmail_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| gmail_error("Gmail base URL cannot have a path"))?
            .pop_if_empty()
            .extend(["users", "me"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, action: &str) -> PrereadResult<T> {
        let access_token = self.token_manager.access_token().await?;

        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| gmail_error(&format!("Failed to {}: {}", action, e)))?;

        let response = check_response(response, action).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| gmail_error(&format!("Failed to parse {} response: {}", action, e)))
    }
}

async fn check_response(response: Response, action: &str) -> PrereadResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Could not read error response".to_string());
    Err(gmail_error(&format!(
        "Failed to {}: HTTP {} - {}",
        action, status, error_body
    )))
}
