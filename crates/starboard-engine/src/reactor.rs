use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use starboard_db::Database;
use starboard_types::events::PlatformEvent;
use starboard_types::models::{BoardChannel, BoardReference, ChannelAccess, Message};
use starboard_types::{ChannelId, CommunityId, MessageKey, UserId};

use crate::boards::BoardRegistry;
use crate::cache::MessageCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, StoreError};
use crate::ledger::{RetractOutcome, VoteLedger, VoteOutcome};
use crate::locks::MessageLocks;
use crate::references::ReferenceDirectory;
use crate::render::{RenderPolicy, render};
use crate::store::MessageStore;
use crate::threshold::ThresholdController;

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not relevant: wrong emoji, no board, self-vote, too old...
    Ignored,
    /// The vote was already recorded, or the retracted vote never existed.
    Duplicate,
    /// Vote count changed; not (yet) on the board.
    Tracked { votes: u32 },
    /// Newly published to the board.
    Promoted { board: MessageKey, votes: u32 },
    /// Existing board entry rewritten in place.
    Updated { votes: u32 },
    /// Cached content refreshed or marked stale; no board entry to touch.
    Cached,
    /// Votes dropped and any board entry removed.
    Retracted,
    /// The board copy vanished; its reference was dropped.
    Unlinked,
    /// The board channel itself was deleted and the board disabled.
    BoardRemoved,
}

/// Totals from one maintenance pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub votes: usize,
    pub references: usize,
    pub messages: usize,
    pub locks: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.votes + self.references + self.messages + self.locks
    }
}

/// Consumes platform events and keeps the board in sync.
///
/// Per message: unseen -> tracked -> promoted -> retracted, with everything
/// outside the retention window purged by [`EventReactor::sweep`].
pub struct EventReactor {
    config: EngineConfig,
    store: Arc<dyn MessageStore>,
    ledger: VoteLedger,
    cache: MessageCache,
    thresholds: ThresholdController,
    references: ReferenceDirectory,
    boards: BoardRegistry,
    locks: MessageLocks,
}

impl EventReactor {
    pub fn new(
        config: EngineConfig,
        db: Arc<Database>,
        store: Arc<dyn MessageStore>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            ledger: VoteLedger::new(db.clone()),
            cache: MessageCache::new(store.clone()),
            thresholds: ThresholdController::new(
                config.min_threshold,
                config.growth_factor,
                config.decay_factor,
            ),
            references: ReferenceDirectory::new(db.clone()),
            boards: BoardRegistry::load(db)?,
            locks: MessageLocks::new(),
            store,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn references(&self) -> &ReferenceDirectory {
        &self.references
    }

    pub async fn threshold(&self, community_id: CommunityId) -> u32 {
        self.thresholds.current(community_id).await
    }

    pub async fn board(&self, community_id: CommunityId) -> Option<BoardChannel> {
        self.boards.board_for(community_id).await
    }

    // -- Board configuration --

    pub async fn enable(
        &self,
        community_id: CommunityId,
        channel_id: ChannelId,
    ) -> Result<BoardChannel, EngineError> {
        let access = self.store.channel_access(channel_id).await?;
        let board = BoardChannel { community_id, channel_id, access };
        self.boards.enable(board).await?;
        info!("Board enabled for community {} in channel {}", community_id, channel_id);
        Ok(board)
    }

    pub async fn reconfigure(
        &self,
        community_id: CommunityId,
        channel_id: ChannelId,
    ) -> Result<BoardChannel, EngineError> {
        let access = self.store.channel_access(channel_id).await?;
        let board = BoardChannel { community_id, channel_id, access };
        let previous = self.boards.reconfigure(board).await?;
        info!(
            "Board for community {} moved from channel {} to {}",
            community_id, previous.channel_id, channel_id
        );
        Ok(board)
    }

    pub async fn disable(&self, community_id: CommunityId) -> Result<BoardChannel, EngineError> {
        let previous = self.boards.disable(community_id).await?;
        info!("Board disabled for community {}", community_id);
        Ok(previous)
    }

    // -- Events --

    /// Handle an event, logging any failure with enough context to replay it.
    /// Never fails: one bad message must not stop the others.
    pub async fn dispatch(&self, event: PlatformEvent) -> Outcome {
        let community = event.community_id();
        let channel = event.channel_id();
        let message = event.message_id();

        match self.handle(event).await {
            Ok(outcome) => {
                debug!(%community, %channel, ?message, ?outcome, "Event handled");
                outcome
            }
            Err(e @ EngineError::Consistency(_)) => {
                error!(%community, %channel, ?message, "{}", e);
                Outcome::Ignored
            }
            Err(e) => {
                warn!(%community, %channel, ?message, "Event failed, board may be stale: {}", e);
                Outcome::Ignored
            }
        }
    }

    pub async fn handle(&self, event: PlatformEvent) -> Result<Outcome, EngineError> {
        match event {
            PlatformEvent::VoteAdd { community_id, channel_id, message_id, voter_id, emoji } => {
                self.on_vote(community_id, MessageKey::new(channel_id, message_id), voter_id, &emoji, true)
                    .await
            }
            PlatformEvent::VoteRemove { community_id, channel_id, message_id, voter_id, emoji } => {
                self.on_vote(community_id, MessageKey::new(channel_id, message_id), voter_id, &emoji, false)
                    .await
            }
            PlatformEvent::VoteClear { community_id, channel_id, message_id } => {
                self.on_clear(community_id, MessageKey::new(channel_id, message_id)).await
            }
            PlatformEvent::VoteClearEmoji { community_id, channel_id, message_id, emoji } => {
                if emoji != self.config.vote_emoji {
                    return Ok(Outcome::Ignored);
                }
                self.on_clear(community_id, MessageKey::new(channel_id, message_id)).await
            }
            PlatformEvent::MessageEdit { community_id, channel_id, message_id, message } => {
                self.on_edit(community_id, MessageKey::new(channel_id, message_id), message).await
            }
            PlatformEvent::MessageDelete { channel_id, message_id, .. } => {
                self.on_delete(MessageKey::new(channel_id, message_id)).await
            }
            PlatformEvent::MessageBulkDelete { channel_id, message_ids, .. } => {
                let mut outcome = Outcome::Ignored;
                for message_id in message_ids {
                    // Keep going: one failure must not leave the rest dangling
                    match self.on_delete(MessageKey::new(channel_id, message_id)).await {
                        Ok(o) => outcome = o,
                        Err(e) => warn!("Bulk delete of {}/{} failed: {}", channel_id, message_id, e),
                    }
                }
                Ok(outcome)
            }
            PlatformEvent::ChannelDelete { community_id, channel_id } => {
                self.on_channel_delete(community_id, channel_id).await
            }
        }
    }

    async fn on_vote(
        &self,
        community_id: CommunityId,
        location: MessageKey,
        voter_id: UserId,
        emoji: &str,
        add: bool,
    ) -> Result<Outcome, EngineError> {
        if emoji != self.config.vote_emoji {
            return Ok(Outcome::Ignored);
        }
        let Some(board) = self.boards.board_for(community_id).await else {
            return Ok(Outcome::Ignored);
        };
        let Some(key) = self.resolve(&board, location).await? else {
            return Ok(Outcome::Ignored);
        };
        if !self.within_retention(key) {
            return Ok(Outcome::Ignored);
        }

        let _guard = self.locks.acquire(key).await;

        // Without the author the vote is still recorded; only the board update waits
        let author = match self.cache.get(key, true).await {
            Ok(Some(message)) => Some(message.author.id),
            Ok(None) => return self.retract(key).await,
            Err(e) if e.is_gone() => return self.retract(key).await,
            Err(e) => {
                warn!("Could not fetch {}, board left stale: {}", key, e);
                None
            }
        };
        if author == Some(voter_id) {
            debug!("Ignoring self-vote by {} on {}", voter_id, key);
            return Ok(Outcome::Ignored);
        }

        let changed = if add {
            self.ledger.cast_vote(community_id, key, voter_id).await? == VoteOutcome::Recorded
        } else {
            self.ledger.retract_vote(key, voter_id).await? == RetractOutcome::Removed
        };
        if !changed {
            return Ok(Outcome::Duplicate);
        }
        if author.is_none() {
            let votes = self.ledger.count(key).await?;
            return Ok(Outcome::Tracked { votes });
        }

        self.sync(community_id, &board, key).await
    }

    async fn on_clear(&self, community_id: CommunityId, key: MessageKey) -> Result<Outcome, EngineError> {
        // Votes on board copies are counted on the original; clearing the copy changes nothing
        if self.boards.is_board_channel(key.channel_id).await
            || self.references.lookup_by_board(key).await?.is_some()
        {
            return Ok(Outcome::Ignored);
        }
        if self.boards.board_for(community_id).await.is_none() {
            return Ok(Outcome::Ignored);
        }

        let _guard = self.locks.acquire(key).await;
        self.retract(key).await
    }

    async fn on_edit(
        &self,
        community_id: CommunityId,
        key: MessageKey,
        message: Option<Message>,
    ) -> Result<Outcome, EngineError> {
        let Some(board) = self.boards.board_for(community_id).await else {
            return Ok(Outcome::Ignored);
        };
        if key.channel_id == board.channel_id || !self.within_retention(key) {
            return Ok(Outcome::Ignored);
        }
        // Our own rewrites of copies left in a previous board channel
        if self.references.lookup_by_board(key).await?.is_some() {
            return Ok(Outcome::Ignored);
        }

        let _guard = self.locks.acquire(key).await;

        match message {
            Some(message) if message.key() == key => {
                if self.cache.contains(key).await {
                    self.cache.replace(message).await;
                }
            }
            _ => {
                self.cache.mark_dirty(key).await;
            }
        }

        match self.references.lookup_by_original(key).await? {
            Some(reference) => {
                let votes = self.ledger.count(key).await?;
                self.refresh(&board, reference, votes).await
            }
            None => Ok(Outcome::Cached),
        }
    }

    async fn on_delete(&self, key: MessageKey) -> Result<Outcome, EngineError> {
        // A board copy deleted out of band: forget the promotion
        if let Some(reference) = self.references.unlink_by_board(key).await? {
            let _guard = self.locks.acquire(reference.original).await;
            self.ledger.clear(reference.original).await?;
            self.cache.remove(reference.original).await;
            info!("Board copy {} of {} was deleted", key, reference.original);
            return Ok(Outcome::Unlinked);
        }

        let _guard = self.locks.acquire(key).await;
        self.retract(key).await
    }

    async fn on_channel_delete(
        &self,
        community_id: CommunityId,
        channel_id: ChannelId,
    ) -> Result<Outcome, EngineError> {
        match self.boards.board_for(community_id).await {
            Some(board) if board.channel_id == channel_id => {
                self.boards.disable(community_id).await?;
                let dropped = self.references.unlink_board_channel(channel_id).await?;
                warn!(
                    "Board channel {} of community {} was deleted; board disabled, {} reference(s) dropped",
                    channel_id, community_id, dropped
                );
                Ok(Outcome::BoardRemoved)
            }
            _ => Ok(Outcome::Ignored),
        }
    }

    /// Map an event location to the message whose votes it affects.
    /// Votes on a board copy count for the original, whichever channel the
    /// copy lives in; other messages in the current board channel count for nothing.
    async fn resolve(
        &self,
        board: &BoardChannel,
        location: MessageKey,
    ) -> Result<Option<MessageKey>, EngineError> {
        if let Some(reference) = self.references.lookup_by_board(location).await? {
            return Ok(Some(reference.original));
        }
        if location.channel_id == board.channel_id {
            return Ok(None);
        }
        Ok(Some(location))
    }

    /// The vote count changed: update the board entry or decide on promotion.
    /// Caller holds the message lock.
    async fn sync(
        &self,
        community_id: CommunityId,
        board: &BoardChannel,
        key: MessageKey,
    ) -> Result<Outcome, EngineError> {
        let votes = self.ledger.count(key).await?;

        if let Some(reference) = self.references.lookup_by_original(key).await? {
            return self.refresh(board, reference, votes).await;
        }

        if !self.within_promotion_window(key) {
            return Ok(Outcome::Tracked { votes });
        }
        let Some(met) = self.thresholds.try_claim(community_id, votes).await else {
            return Ok(Outcome::Tracked { votes });
        };

        info!("Promoting {} with {} votes (threshold {})", key, votes, met);
        let promoted = self.promote(board, key, votes).await;
        if let Err(e) = &promoted {
            warn!(
                "Promotion of {} failed after claiming threshold {} in community {}: {}",
                key, met, community_id, e
            );
        }
        promoted
    }

    async fn promote(
        &self,
        board: &BoardChannel,
        key: MessageKey,
        votes: u32,
    ) -> Result<Outcome, EngineError> {
        let message = match self.cache.get(key, false).await {
            Ok(Some(message)) => message,
            Ok(None) => return self.retract(key).await,
            Err(e) if e.is_gone() => return self.retract(key).await,
            Err(e) => return Err(e.into()),
        };

        let payload = render(&message, votes, &self.policy(board, board.channel_id));
        let board_message_id = self.store.publish(board.channel_id, &payload).await?;
        let board_key = MessageKey::new(board.channel_id, board_message_id);

        match self.references.link(key, board_key).await {
            Ok(_) => Ok(Outcome::Promoted { board: board_key, votes }),
            Err(e) => {
                // Never leave an unreferenced copy behind
                if let Err(del) = self.store.delete(board_key.channel_id, board_key.message_id).await {
                    warn!("Could not remove orphaned board copy {}: {}", board_key, del);
                }
                Err(e)
            }
        }
    }

    /// Rewrite an existing board entry in place with fresh content.
    async fn refresh(
        &self,
        board: &BoardChannel,
        reference: BoardReference,
        votes: u32,
    ) -> Result<Outcome, EngineError> {
        let message = match self.cache.get(reference.original, false).await {
            Ok(Some(message)) => message,
            Ok(None) => return self.retract(reference.original).await,
            Err(e) if e.is_gone() => return self.retract(reference.original).await,
            Err(e) => return Err(e.into()),
        };

        let payload = render(&message, votes, &self.policy(board, reference.board.channel_id));
        match self
            .store
            .update(reference.board.channel_id, reference.board.message_id, &payload)
            .await
        {
            Ok(()) => Ok(Outcome::Updated { votes }),
            Err(e) if e.is_gone() => {
                warn!("Board copy {} is gone ({}), dropping reference", reference.board, e);
                self.references.unlink_by_board(reference.board).await?;
                Ok(Outcome::Unlinked)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop all votes for a message and take down its board entry, if any.
    /// Idempotent. Caller holds the message lock.
    async fn retract(&self, key: MessageKey) -> Result<Outcome, EngineError> {
        self.ledger.clear(key).await?;
        self.cache.remove(key).await;

        if let Some(reference) = self.references.unlink_by_original(key).await? {
            match self
                .store
                .delete(reference.board.channel_id, reference.board.message_id)
                .await
            {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(e) => warn!("Could not delete board copy {} of {}: {}", reference.board, key, e),
            }
            info!("Retracted {} from the board", key);
        }
        Ok(Outcome::Retracted)
    }

    /// Board entries left behind in a previous board channel get the most
    /// conservative access, so nothing leaks into a channel we know nothing about.
    fn policy<'a>(&'a self, board: &BoardChannel, target: ChannelId) -> RenderPolicy<'a> {
        let board_access = if target == board.channel_id {
            board.access
        } else {
            ChannelAccess::default()
        };
        RenderPolicy {
            emoji: &self.config.vote_emoji,
            board_access,
        }
    }

    fn within_retention(&self, key: MessageKey) -> bool {
        key.created_at() >= Utc::now() - self.config.retention
    }

    fn within_promotion_window(&self, key: MessageKey) -> bool {
        key.created_at() >= Utc::now() - self.config.promotion_window
    }

    // -- Maintenance --

    /// One maintenance pass: decay thresholds, prune the ledger and references
    /// in independently committed batches, evict the cache and idle locks.
    /// Stops between batches once `shutdown` flips to true.
    pub async fn sweep(&self, shutdown: &watch::Receiver<bool>) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::default();
        let cutoff = Utc::now() - self.config.retention;
        let batch = self.config.purge_batch;

        self.thresholds.decay_all().await;

        loop {
            if *shutdown.borrow() {
                return Ok(report);
            }
            let deleted = self.ledger.purge_older_than(cutoff, batch).await?;
            report.votes += deleted;
            if deleted < batch {
                break;
            }
        }

        loop {
            if *shutdown.borrow() {
                return Ok(report);
            }
            let deleted = self.references.purge_older_than(cutoff, batch).await?;
            report.references += deleted;
            if deleted < batch {
                break;
            }
        }

        report.messages = self.cache.evict_older_than(cutoff).await;
        report.locks = self.locks.prune();
        Ok(report)
    }
}
