use thiserror::Error;

use starboard_types::{ChannelId, CommunityId};

/// Failures reported by the chat platform.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found on the platform")]
    NotFound,

    /// Network trouble or rate limiting. Left to self-heal on the next event.
    #[error("transient platform error: {0}")]
    Transient(String),

    /// Channel deleted, access revoked and the like.
    #[error("permanent platform error: {0}")]
    Permanent(String),
}

impl StoreError {
    /// The target will never come back.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound | Self::Permanent(_))
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database error: {0:#}")]
    Database(anyhow::Error),

    /// An invariant was broken. Always a bug, never swallowed.
    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("community {0} already has a board")]
    AlreadyEnabled(CommunityId),

    #[error("community {0} has no board")]
    NotEnabled(CommunityId),

    #[error("channel {0} is already a board")]
    BoardInUse(ChannelId),

    #[error("blocking task failed: {0}")]
    Join(String),
}
