use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, CommunityId, MessageId, MessageKey, UserId};

/// Visibility of a channel. Content may only flow from a channel to a board
/// that is at least as restricted on both axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelAccess {
    /// Not readable by every member of the community.
    pub restricted: bool,
    /// Marked as sensitive / age-gated.
    pub sensitive: bool,
}

impl ChannelAccess {
    /// Whether content from `self` may be shown in a channel with `target` access.
    pub fn may_expose_to(&self, target: &ChannelAccess) -> bool {
        (!self.restricted || target.restricted) && (!self.sensitive || target.sensitive)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        match &self.content_type {
            Some(ct) => ct.starts_with("image/"),
            None => is_image_url(&self.filename),
        }
    }
}

/// The message being replied to, as far as the platform resolved it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub author_name: String,
    pub content: String,
}

/// A message as fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub community_id: CommunityId,
    pub author: Author,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reply_to: Option<ReplyContext>,
    /// Access of the channel the message lives in.
    #[serde(default)]
    pub channel_access: ChannelAccess,
}

impl Message {
    pub fn key(&self) -> MessageKey {
        MessageKey::new(self.channel_id, self.id)
    }
}

/// Durable link between an original message and its copy on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardReference {
    pub board: MessageKey,
    pub original: MessageKey,
}

/// The board channel configured for a community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardChannel {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub access: ChannelAccess,
}

/// Where the "jump to message" link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpLink {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// Rich content of a board entry. Absent when the source channel may not be exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardEmbed {
    pub author_name: String,
    pub author_icon_url: Option<String>,
    pub description: String,
    pub image_url: Option<String>,
    pub fields: Vec<EmbedField>,
    /// RFC 3339 creation time of the original message.
    pub timestamp: String,
    pub footer: String,
}

/// What gets published to, and later updated on, the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPayload {
    pub content: String,
    pub jump: JumpLink,
    pub embed: Option<BoardEmbed>,
}

const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// Whether a URL or filename points at an image, ignoring any query string.
pub fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
