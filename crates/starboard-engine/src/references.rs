use std::sync::Arc;

use chrono::{DateTime, Utc};

use starboard_db::Database;
use starboard_types::models::BoardReference;
use starboard_types::{ChannelId, MessageKey, Snowflake};

use crate::blocking;
use crate::error::EngineError;

/// Durable original <-> board copy mapping.
pub struct ReferenceDirectory {
    db: Arc<Database>,
}

impl ReferenceDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a promotion. A second link for the same original is a
    /// consistency violation and the caller must not proceed.
    pub async fn link(
        &self,
        original: MessageKey,
        board: MessageKey,
    ) -> Result<BoardReference, EngineError> {
        let reference = BoardReference { board, original };
        let inserted = blocking(&self.db, move |db| db.insert_board_reference(&reference)).await?;
        if !inserted {
            return Err(EngineError::Consistency(format!(
                "message {} is already linked to a board entry",
                original
            )));
        }
        Ok(reference)
    }

    pub async fn lookup_by_original(
        &self,
        key: MessageKey,
    ) -> Result<Option<BoardReference>, EngineError> {
        blocking(&self.db, move |db| db.board_reference_by_original(key)).await
    }

    /// Resolve a board copy back to its original.
    pub async fn lookup_by_board(
        &self,
        key: MessageKey,
    ) -> Result<Option<BoardReference>, EngineError> {
        blocking(&self.db, move |db| db.board_reference_by_board(key)).await
    }

    /// Remove and return the reference for an original. Missing rows are fine:
    /// the counterpart may already be gone.
    pub async fn unlink_by_original(
        &self,
        key: MessageKey,
    ) -> Result<Option<BoardReference>, EngineError> {
        blocking(&self.db, move |db| db.take_board_reference_by_original(key)).await
    }

    pub async fn unlink_by_board(
        &self,
        key: MessageKey,
    ) -> Result<Option<BoardReference>, EngineError> {
        blocking(&self.db, move |db| db.take_board_reference_by_board(key)).await
    }

    /// Forget every board copy living in a channel that no longer exists.
    pub async fn unlink_board_channel(&self, channel_id: ChannelId) -> Result<usize, EngineError> {
        blocking(&self.db, move |db| db.delete_board_references_in(channel_id)).await
    }

    /// Delete one batch of references whose original predates `cutoff`.
    pub async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
        batch: usize,
    ) -> Result<usize, EngineError> {
        let cutoff_id = Snowflake::lowest_at(cutoff);
        blocking(&self.db, move |db| db.purge_board_references_before(cutoff_id, batch)).await
    }
}
