use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use starboard_db::Database;
use starboard_types::models::BoardChannel;
use starboard_types::{ChannelId, CommunityId};

use crate::blocking;
use crate::error::EngineError;

/// Which channel is the board in each community. Persisted in
/// `board_channels`, mirrored in memory for the event path.
pub struct BoardRegistry {
    db: Arc<Database>,
    boards: RwLock<HashMap<CommunityId, BoardChannel>>,
}

impl BoardRegistry {
    /// Load every configured board. Called once at startup.
    pub fn load(db: Arc<Database>) -> Result<Self, EngineError> {
        let boards: HashMap<_, _> = db
            .list_board_channels()
            .map_err(EngineError::Database)?
            .into_iter()
            .map(|board| (board.community_id, board))
            .collect();

        info!("Loaded {} board channel(s)", boards.len());
        Ok(Self {
            db,
            boards: RwLock::new(boards),
        })
    }

    pub async fn board_for(&self, community_id: CommunityId) -> Option<BoardChannel> {
        self.boards.read().await.get(&community_id).copied()
    }

    pub async fn is_board_channel(&self, channel_id: ChannelId) -> bool {
        self.boards
            .read()
            .await
            .values()
            .any(|board| board.channel_id == channel_id)
    }

    pub async fn enable(&self, board: BoardChannel) -> Result<(), EngineError> {
        let mut boards = self.boards.write().await;
        if boards.contains_key(&board.community_id) {
            return Err(EngineError::AlreadyEnabled(board.community_id));
        }
        if boards.values().any(|b| b.channel_id == board.channel_id) {
            return Err(EngineError::BoardInUse(board.channel_id));
        }

        let inserted = blocking(&self.db, move |db| db.insert_board_channel(&board)).await?;
        if !inserted {
            return Err(EngineError::BoardInUse(board.channel_id));
        }

        boards.insert(board.community_id, board);
        Ok(())
    }

    /// Point a community's board at another channel. Returns the previous one.
    pub async fn reconfigure(&self, board: BoardChannel) -> Result<BoardChannel, EngineError> {
        let mut boards = self.boards.write().await;
        let Some(previous) = boards.get(&board.community_id).copied() else {
            return Err(EngineError::NotEnabled(board.community_id));
        };
        if boards
            .values()
            .any(|b| b.channel_id == board.channel_id && b.community_id != board.community_id)
        {
            return Err(EngineError::BoardInUse(board.channel_id));
        }

        let updated = blocking(&self.db, move |db| db.update_board_channel(&board)).await?;
        if !updated {
            return Err(EngineError::BoardInUse(board.channel_id));
        }

        boards.insert(board.community_id, board);
        Ok(previous)
    }

    /// Stop the board. Returns the channel it used.
    pub async fn disable(&self, community_id: CommunityId) -> Result<BoardChannel, EngineError> {
        let mut boards = self.boards.write().await;
        let Some(previous) = boards.get(&community_id).copied() else {
            return Err(EngineError::NotEnabled(community_id));
        };

        blocking(&self.db, move |db| db.delete_board_channel(community_id)).await?;
        boards.remove(&community_id);
        Ok(previous)
    }
}
