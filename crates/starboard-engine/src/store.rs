use async_trait::async_trait;

use starboard_types::models::{BoardPayload, ChannelAccess, Message};
use starboard_types::{ChannelId, MessageId};

use crate::error::StoreError;

/// The chat platform, as far as the engine needs it.
///
/// Every call may block on the network; the engine never holds a lock other
/// than the per-message one across them.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn fetch_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<Message, StoreError>;

    async fn channel_access(&self, channel_id: ChannelId) -> Result<ChannelAccess, StoreError>;

    /// Post a new message, returning its id.
    async fn publish(
        &self,
        channel_id: ChannelId,
        payload: &BoardPayload,
    ) -> Result<MessageId, StoreError>;

    async fn update(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        payload: &BoardPayload,
    ) -> Result<(), StoreError>;

    async fn delete(&self, channel_id: ChannelId, message_id: MessageId) -> Result<(), StoreError>;
}
