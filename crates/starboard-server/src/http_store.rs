use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use starboard_engine::{MessageStore, StoreError};
use starboard_types::models::{BoardPayload, ChannelAccess, Message};
use starboard_types::{ChannelId, MessageId};

/// [`MessageStore`] backed by the platform's REST API.
pub struct HttpMessageStore {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: MessageId,
}

impl HttpMessageStore {
    pub fn new(base_url: &str, token: String) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn message_url(&self, channel_id: ChannelId, message_id: MessageId) -> String {
        format!("{}/channels/{}/messages/{}", self.base_url, channel_id, message_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        debug!("Platform answered {}", status);
        Err(classify(status))
    }
}

fn classify(status: StatusCode) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::GONE => {
            StoreError::Permanent(status.to_string())
        }
        _ => StoreError::Transient(status.to_string()),
    }
}

#[async_trait]
impl MessageStore for HttpMessageStore {
    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<Message, StoreError> {
        let response = self
            .send(self.client.get(self.message_url(channel_id, message_id)))
            .await?;
        response
            .json::<Message>()
            .await
            .map_err(|e| StoreError::Transient(format!("malformed message: {}", e)))
    }

    async fn channel_access(&self, channel_id: ChannelId) -> Result<ChannelAccess, StoreError> {
        let url = format!("{}/channels/{}", self.base_url, channel_id);
        let response = self.send(self.client.get(url)).await?;
        response
            .json::<ChannelAccess>()
            .await
            .map_err(|e| StoreError::Transient(format!("malformed channel: {}", e)))
    }

    async fn publish(
        &self,
        channel_id: ChannelId,
        payload: &BoardPayload,
    ) -> Result<MessageId, StoreError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel_id);
        let response = self.send(self.client.post(url).json(payload)).await?;
        let created = response
            .json::<CreatedMessage>()
            .await
            .map_err(|e| StoreError::Transient(format!("malformed publish response: {}", e)))?;
        Ok(created.id)
    }

    async fn update(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        payload: &BoardPayload,
    ) -> Result<(), StoreError> {
        self.send(self.client.patch(self.message_url(channel_id, message_id)).json(payload))
            .await?;
        Ok(())
    }

    async fn delete(&self, channel_id: ChannelId, message_id: MessageId) -> Result<(), StoreError> {
        self.send(self.client.delete(self.message_url(channel_id, message_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(classify(StatusCode::NOT_FOUND), StoreError::NotFound));
        assert!(matches!(classify(StatusCode::FORBIDDEN), StoreError::Permanent(_)));
        assert!(matches!(classify(StatusCode::GONE), StoreError::Permanent(_)));
        assert!(matches!(classify(StatusCode::TOO_MANY_REQUESTS), StoreError::Transient(_)));
        assert!(matches!(classify(StatusCode::BAD_GATEWAY), StoreError::Transient(_)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = HttpMessageStore::new("https://chat.example/api/", "t".into()).unwrap();
        assert_eq!(
            store.message_url(ChannelId::from(1), MessageId::from(2)),
            "https://chat.example/api/channels/1/messages/2"
        );
    }
}
