use crate::Database;
use crate::models::{BoardChannelRow, BoardReferenceRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use starboard_types::models::{BoardChannel, BoardReference};
use starboard_types::{ChannelId, CommunityId, MessageKey, Snowflake, UserId};

impl Database {
    // -- Votes --

    /// Insert a vote. Returns false if this voter already voted for the message.
    pub fn insert_vote(
        &self,
        community_id: CommunityId,
        key: MessageKey,
        voter_id: UserId,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO votes (community_id, channel_id, message_id, voter_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    community_id.to_sql(),
                    key.channel_id.to_sql(),
                    key.message_id.to_sql(),
                    voter_id.to_sql()
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Delete a vote. Returns false if it was never cast.
    pub fn delete_vote(&self, key: MessageKey, voter_id: UserId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM votes WHERE channel_id = ?1 AND message_id = ?2 AND voter_id = ?3",
                params![key.channel_id.to_sql(), key.message_id.to_sql(), voter_id.to_sql()],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn count_votes(&self, key: MessageKey) -> Result<u32> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM votes WHERE channel_id = ?1 AND message_id = ?2",
                params![key.channel_id.to_sql(), key.message_id.to_sql()],
                |row| row.get(0),
            )?;
            Ok(count as u32)
        })
    }

    /// Drop every vote for a message. Returns the number of rows removed.
    pub fn delete_votes_for_message(&self, key: MessageKey) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM votes WHERE channel_id = ?1 AND message_id = ?2",
                params![key.channel_id.to_sql(), key.message_id.to_sql()],
            )?;
            Ok(deleted)
        })
    }

    /// Delete up to `batch` votes for messages minted before `cutoff`.
    /// Each call commits on its own, so an interrupted prune leaves no partial state.
    pub fn purge_votes_before(&self, cutoff: Snowflake, batch: usize) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM votes WHERE rowid IN (
                    SELECT rowid FROM votes WHERE message_id < ?1 LIMIT ?2
                 )",
                params![cutoff.to_sql(), batch as i64],
            )?;
            Ok(deleted)
        })
    }

    // -- Board references --

    /// Record a promotion. Returns false if the original (or the board copy)
    /// is already linked.
    pub fn insert_board_reference(&self, reference: &BoardReference) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO board_references
                    (board_message_id, board_channel_id, original_message_id, original_channel_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    reference.board.message_id.to_sql(),
                    reference.board.channel_id.to_sql(),
                    reference.original.message_id.to_sql(),
                    reference.original.channel_id.to_sql()
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn board_reference_by_original(&self, key: MessageKey) -> Result<Option<BoardReference>> {
        self.with_conn(|conn| {
            query_board_reference(
                conn,
                "original_channel_id = ?1 AND original_message_id = ?2",
                key,
            )
        })
    }

    pub fn board_reference_by_board(&self, key: MessageKey) -> Result<Option<BoardReference>> {
        self.with_conn(|conn| {
            query_board_reference(conn, "board_channel_id = ?1 AND board_message_id = ?2", key)
        })
    }

    /// Remove and return the reference for an original, if any.
    pub fn take_board_reference_by_original(&self, key: MessageKey) -> Result<Option<BoardReference>> {
        self.with_conn_mut(|conn| {
            take_board_reference(
                conn,
                "original_channel_id = ?1 AND original_message_id = ?2",
                key,
            )
        })
    }

    /// Remove and return the reference for a board copy, if any.
    pub fn take_board_reference_by_board(&self, key: MessageKey) -> Result<Option<BoardReference>> {
        self.with_conn_mut(|conn| {
            take_board_reference(conn, "board_channel_id = ?1 AND board_message_id = ?2", key)
        })
    }

    /// Drop every reference whose board copy lives in `board_channel_id`.
    pub fn delete_board_references_in(&self, board_channel_id: ChannelId) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM board_references WHERE board_channel_id = ?1",
                [board_channel_id.to_sql()],
            )?;
            Ok(deleted)
        })
    }

    /// Delete up to `batch` references whose original was minted before `cutoff`.
    pub fn purge_board_references_before(&self, cutoff: Snowflake, batch: usize) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM board_references WHERE rowid IN (
                    SELECT rowid FROM board_references WHERE original_message_id < ?1 LIMIT ?2
                 )",
                params![cutoff.to_sql(), batch as i64],
            )?;
            Ok(deleted)
        })
    }

    // -- Board channels --

    /// Returns false if the community already has a board or the channel is
    /// already a board elsewhere.
    pub fn insert_board_channel(&self, board: &BoardChannel) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO board_channels (community_id, channel_id, restricted, sensitive)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    board.community_id.to_sql(),
                    board.channel_id.to_sql(),
                    board.access.restricted,
                    board.access.sensitive
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Point an existing board at a new channel. Returns false if the community
    /// has no board or the channel is taken.
    pub fn update_board_channel(&self, board: &BoardChannel) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE OR IGNORE board_channels
                 SET channel_id = ?2, restricted = ?3, sensitive = ?4
                 WHERE community_id = ?1",
                params![
                    board.community_id.to_sql(),
                    board.channel_id.to_sql(),
                    board.access.restricted,
                    board.access.sensitive
                ],
            )?;
            Ok(updated == 1)
        })
    }

    pub fn delete_board_channel(&self, community_id: CommunityId) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM board_channels WHERE community_id = ?1",
                [community_id.to_sql()],
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn list_board_channels(&self) -> Result<Vec<BoardChannel>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT community_id, channel_id, restricted, sensitive FROM board_channels",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(BoardChannelRow {
                        community_id: row.get(0)?,
                        channel_id: row.get(1)?,
                        restricted: row.get(2)?,
                        sensitive: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(BoardChannel::from).collect())
        })
    }
}

fn query_board_reference(
    conn: &Connection,
    filter: &str,
    key: MessageKey,
) -> Result<Option<BoardReference>> {
    let sql = format!(
        "SELECT board_message_id, board_channel_id, original_message_id, original_channel_id
         FROM board_references WHERE {}",
        filter
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row(params![key.channel_id.to_sql(), key.message_id.to_sql()], |row| {
            Ok(BoardReferenceRow {
                board_message_id: row.get(0)?,
                board_channel_id: row.get(1)?,
                original_message_id: row.get(2)?,
                original_channel_id: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row.map(BoardReference::from))
}

fn take_board_reference(
    conn: &mut Connection,
    filter: &str,
    key: MessageKey,
) -> Result<Option<BoardReference>> {
    let tx = conn.transaction()?;
    let reference = query_board_reference(&tx, filter, key)?;
    if reference.is_some() {
        tx.execute(
            &format!("DELETE FROM board_references WHERE {}", filter),
            params![key.channel_id.to_sql(), key.message_id.to_sql()],
        )?;
    }
    tx.commit()?;
    Ok(reference)
}
