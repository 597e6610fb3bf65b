#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use starboard_db::Database;
use starboard_engine::{EngineConfig, EventReactor, MessageStore, StoreError};
use starboard_types::events::PlatformEvent;
use starboard_types::models::{Author, BoardPayload, ChannelAccess, Message};
use starboard_types::{ChannelId, CommunityId, MessageId, MessageKey, Snowflake, UserId};

pub const COMMUNITY: CommunityId = Snowflake(1);
pub const SOURCE: ChannelId = Snowflake(10);
pub const BOARD: ChannelId = Snowflake(50);
pub const AUTHOR: UserId = Snowflake(5);

/// In-process platform that records what the engine did to the board.
#[derive(Default)]
pub struct FakeStore {
    pub messages: Mutex<HashMap<MessageKey, Message>>,
    pub access: Mutex<HashMap<ChannelId, ChannelAccess>>,
    pub board: Mutex<HashMap<MessageKey, BoardPayload>>,
    pub publishes: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fetches: AtomicUsize,
    pub fail_next_fetch: AtomicBool,
    pub fail_updates: AtomicBool,
    pub fail_publishes: AtomicBool,
    next_id: AtomicU64,
}

impl FakeStore {
    pub fn put(&self, message: Message) {
        self.messages.lock().unwrap().insert(message.key(), message);
    }

    pub fn set_content(&self, key: MessageKey, content: &str) {
        if let Some(m) = self.messages.lock().unwrap().get_mut(&key) {
            m.content = content.to_string();
        }
    }

    pub fn entry(&self, key: MessageKey) -> Option<BoardPayload> {
        self.board.lock().unwrap().get(&key).cloned()
    }

    pub fn board_len(&self) -> usize {
        self.board.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Message, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_fetch.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Transient("rate limited".into()));
        }
        self.messages
            .lock()
            .unwrap()
            .get(&MessageKey::new(channel_id, message_id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn channel_access(&self, channel_id: ChannelId) -> Result<ChannelAccess, StoreError> {
        Ok(self.access.lock().unwrap().get(&channel_id).copied().unwrap_or_default())
    }

    async fn publish(&self, channel_id: ChannelId, payload: &BoardPayload) -> Result<MessageId, StoreError> {
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("service unavailable".into()));
        }
        self.publishes.fetch_add(1, Ordering::SeqCst);
        let id = Snowflake(9_000_000 + self.next_id.fetch_add(1, Ordering::SeqCst));
        self.board
            .lock()
            .unwrap()
            .insert(MessageKey::new(channel_id, id), payload.clone());
        Ok(id)
    }

    async fn update(&self, channel_id: ChannelId, message_id: MessageId, payload: &BoardPayload) -> Result<(), StoreError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Transient("gateway timeout".into()));
        }
        let mut board = self.board.lock().unwrap();
        match board.get_mut(&MessageKey::new(channel_id, message_id)) {
            Some(entry) => {
                self.updates.fetch_add(1, Ordering::SeqCst);
                *entry = payload.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, channel_id: ChannelId, message_id: MessageId) -> Result<(), StoreError> {
        match self.board.lock().unwrap().remove(&MessageKey::new(channel_id, message_id)) {
            Some(_) => {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

pub struct Harness {
    pub store: Arc<FakeStore>,
    pub db: Arc<Database>,
    pub reactor: Arc<EventReactor>,
}

impl Harness {
    /// Board enabled in `BOARD` for `COMMUNITY`, minimum threshold 2.
    pub async fn new() -> Self {
        Self::with_config(EngineConfig { min_threshold: 2, ..EngineConfig::default() }).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(FakeStore::default());
        let db = Arc::new(Database::open_in_memory().unwrap());
        let reactor = Arc::new(EventReactor::new(config, db.clone(), store.clone()).unwrap());
        reactor.enable(COMMUNITY, BOARD).await.unwrap();
        Self { store, db, reactor }
    }

    /// Put a message `minutes_old` minutes old on the platform.
    pub fn post(&self, minutes_old: i64, seq: u64, content: &str) -> MessageKey {
        let id = Snowflake(Snowflake::lowest_at(Utc::now() - chrono::Duration::minutes(minutes_old)).0 + seq);
        self.store.put(Message {
            id,
            channel_id: SOURCE,
            community_id: COMMUNITY,
            author: Author { id: AUTHOR, name: "ada".into(), avatar_url: None },
            content: content.into(),
            attachments: vec![],
            reply_to: None,
            channel_access: ChannelAccess::default(),
        });
        MessageKey::new(SOURCE, id)
    }

    pub fn reference_of(&self, key: MessageKey) -> Option<MessageKey> {
        self.db
            .board_reference_by_original(key)
            .unwrap()
            .map(|r| r.board)
    }
}

pub fn vote(key: MessageKey, voter: u64) -> PlatformEvent {
    PlatformEvent::VoteAdd {
        community_id: COMMUNITY,
        channel_id: key.channel_id,
        message_id: key.message_id,
        voter_id: Snowflake(voter),
        emoji: "⭐".into(),
    }
}

pub fn unvote(key: MessageKey, voter: u64) -> PlatformEvent {
    PlatformEvent::VoteRemove {
        community_id: COMMUNITY,
        channel_id: key.channel_id,
        message_id: key.message_id,
        voter_id: Snowflake(voter),
        emoji: "⭐".into(),
    }
}

pub fn edit(key: MessageKey, message: Option<Message>) -> PlatformEvent {
    PlatformEvent::MessageEdit {
        community_id: COMMUNITY,
        channel_id: key.channel_id,
        message_id: key.message_id,
        message,
    }
}

pub fn delete(key: MessageKey) -> PlatformEvent {
    PlatformEvent::MessageDelete {
        community_id: COMMUNITY,
        channel_id: key.channel_id,
        message_id: key.message_id,
    }
}
