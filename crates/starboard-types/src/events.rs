use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, CommunityId, MessageId, UserId};
use crate::models::Message;

/// Raw events delivered by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PlatformEvent {
    /// A user reacted to a message
    VoteAdd {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
        voter_id: UserId,
        emoji: String,
    },

    /// A user removed their reaction
    VoteRemove {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
        voter_id: UserId,
        emoji: String,
    },

    /// Every reaction on a message was cleared
    VoteClear {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
    },

    /// All reactions of one emoji were cleared
    VoteClearEmoji {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: String,
    },

    /// A message was edited. The platform may omit the new content.
    MessageEdit {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
        message: Option<Message>,
    },

    MessageDelete {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_id: MessageId,
    },

    MessageBulkDelete {
        community_id: CommunityId,
        channel_id: ChannelId,
        message_ids: Vec<MessageId>,
    },

    ChannelDelete {
        community_id: CommunityId,
        channel_id: ChannelId,
    },
}

impl PlatformEvent {
    pub fn community_id(&self) -> CommunityId {
        match self {
            Self::VoteAdd { community_id, .. }
            | Self::VoteRemove { community_id, .. }
            | Self::VoteClear { community_id, .. }
            | Self::VoteClearEmoji { community_id, .. }
            | Self::MessageEdit { community_id, .. }
            | Self::MessageDelete { community_id, .. }
            | Self::MessageBulkDelete { community_id, .. }
            | Self::ChannelDelete { community_id, .. } => *community_id,
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::VoteAdd { channel_id, .. }
            | Self::VoteRemove { channel_id, .. }
            | Self::VoteClear { channel_id, .. }
            | Self::VoteClearEmoji { channel_id, .. }
            | Self::MessageEdit { channel_id, .. }
            | Self::MessageDelete { channel_id, .. }
            | Self::MessageBulkDelete { channel_id, .. }
            | Self::ChannelDelete { channel_id, .. } => *channel_id,
        }
    }

    /// The single message this event concerns, if any.
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::VoteAdd { message_id, .. }
            | Self::VoteRemove { message_id, .. }
            | Self::VoteClear { message_id, .. }
            | Self::VoteClearEmoji { message_id, .. }
            | Self::MessageEdit { message_id, .. }
            | Self::MessageDelete { message_id, .. } => Some(*message_id),
            Self::MessageBulkDelete { .. } | Self::ChannelDelete { .. } => None,
        }
    }
}
