use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use starboard_db::Database;
use starboard_types::{CommunityId, MessageKey, Snowflake, UserId};

use crate::blocking;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    /// This voter already voted for the message.
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetractOutcome {
    Removed,
    NotFound,
}

/// Deduplicated votes. The `votes` table is the source of truth; counts are
/// cached in memory and rebuilt from it on the next read when missing.
pub struct VoteLedger {
    db: Arc<Database>,
    counts: RwLock<HashMap<MessageKey, u32>>,
}

impl VoteLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            counts: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cast_vote(
        &self,
        community_id: CommunityId,
        key: MessageKey,
        voter_id: UserId,
    ) -> Result<VoteOutcome, EngineError> {
        let inserted = blocking(&self.db, move |db| db.insert_vote(community_id, key, voter_id)).await?;
        if !inserted {
            return Ok(VoteOutcome::Duplicate);
        }

        // Durable first; an absent entry is rebuilt from the table on read
        if let Some(count) = self.counts.write().await.get_mut(&key) {
            *count += 1;
        }
        Ok(VoteOutcome::Recorded)
    }

    pub async fn retract_vote(
        &self,
        key: MessageKey,
        voter_id: UserId,
    ) -> Result<RetractOutcome, EngineError> {
        let deleted = blocking(&self.db, move |db| db.delete_vote(key, voter_id)).await?;
        if !deleted {
            return Ok(RetractOutcome::NotFound);
        }

        if let Some(count) = self.counts.write().await.get_mut(&key) {
            *count = count.saturating_sub(1);
        }
        Ok(RetractOutcome::Removed)
    }

    pub async fn count(&self, key: MessageKey) -> Result<u32, EngineError> {
        if let Some(count) = self.counts.read().await.get(&key) {
            return Ok(*count);
        }

        let count = blocking(&self.db, move |db| db.count_votes(key)).await?;
        self.counts.write().await.insert(key, count);
        Ok(count)
    }

    /// Drop every vote for a message. Returns how many were removed.
    pub async fn clear(&self, key: MessageKey) -> Result<usize, EngineError> {
        let removed = blocking(&self.db, move |db| db.delete_votes_for_message(key)).await?;
        self.counts.write().await.remove(&key);
        Ok(removed)
    }

    /// Delete one batch of votes for messages created before `cutoff`.
    /// Returns the number of rows deleted; fewer than `batch` means done.
    pub async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
        batch: usize,
    ) -> Result<usize, EngineError> {
        let cutoff_id = Snowflake::lowest_at(cutoff);
        let deleted = blocking(&self.db, move |db| db.purge_votes_before(cutoff_id, batch)).await?;
        self.counts
            .write()
            .await
            .retain(|key, _| key.message_id >= cutoff_id);
        Ok(deleted)
    }
}
