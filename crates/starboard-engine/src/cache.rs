use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use starboard_types::MessageKey;
use starboard_types::models::Message;

use crate::error::StoreError;
use crate::store::MessageStore;

struct CachedMessage {
    message: Message,
    /// The platform reported an edit we have not fetched yet.
    dirty: bool,
}

/// Last-known content of tracked messages.
///
/// Distinguishes "have content, might be stale" from "known stale": an edit
/// notification without a payload only marks the entry, and the refetch is
/// deferred until someone needs fresh content.
pub struct MessageCache {
    store: Arc<dyn MessageStore>,
    entries: RwLock<HashMap<MessageKey, CachedMessage>>,
}

impl MessageCache {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cached copy of a message, fetching it on a miss. With `allow_stale`
    /// false a dirty entry is refetched first.
    ///
    /// `Ok(None)` means the platform no longer has the message.
    pub async fn get(&self, key: MessageKey, allow_stale: bool) -> Result<Option<Message>, StoreError> {
        if let Some(entry) = self.entries.read().await.get(&key) {
            if allow_stale || !entry.dirty {
                return Ok(Some(entry.message.clone()));
            }
        }

        debug!("Fetching message {}", key);
        match self.store.fetch_message(key.channel_id, key.message_id).await {
            Ok(message) => {
                self.insert(key, message.clone()).await;
                Ok(Some(message))
            }
            Err(StoreError::NotFound) => {
                self.remove(key).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns false if the message was not cached; the next `get` fetches it anyway.
    pub async fn mark_dirty(&self, key: MessageKey) -> bool {
        match self.entries.write().await.get_mut(&key) {
            Some(entry) => {
                entry.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Install freshly fetched content, clearing the dirty flag.
    pub async fn replace(&self, message: Message) {
        self.insert(message.key(), message).await;
    }

    pub async fn contains(&self, key: MessageKey) -> bool {
        self.entries.read().await.contains_key(&key)
    }

    pub async fn is_dirty(&self, key: MessageKey) -> bool {
        self.entries
            .read()
            .await
            .get(&key)
            .is_some_and(|entry| entry.dirty)
    }

    pub async fn remove(&self, key: MessageKey) {
        self.entries.write().await.remove(&key);
    }

    /// Drop entries for messages created before `cutoff`. Returns how many went.
    pub async fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.created_at() >= cutoff);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn insert(&self, key: MessageKey, message: Message) {
        self.entries
            .write()
            .await
            .insert(key, CachedMessage { message, dirty: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use starboard_types::models::{Author, BoardPayload, ChannelAccess};
    use starboard_types::{ChannelId, MessageId, Snowflake};

    /// Serves whatever content is currently set, counting fetches.
    struct Source {
        content: Mutex<Option<String>>,
        fetches: Mutex<usize>,
    }

    #[async_trait]
    impl MessageStore for Source {
        async fn fetch_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<Message, StoreError> {
            *self.fetches.lock().unwrap() += 1;
            let content = self.content.lock().unwrap().clone().ok_or(StoreError::NotFound)?;
            Ok(message(channel_id, message_id, &content))
        }

        async fn channel_access(&self, _: ChannelId) -> Result<ChannelAccess, StoreError> {
            Ok(ChannelAccess::default())
        }

        async fn publish(&self, _: ChannelId, _: &BoardPayload) -> Result<MessageId, StoreError> {
            unreachable!()
        }

        async fn update(&self, _: ChannelId, _: MessageId, _: &BoardPayload) -> Result<(), StoreError> {
            unreachable!()
        }

        async fn delete(&self, _: ChannelId, _: MessageId) -> Result<(), StoreError> {
            unreachable!()
        }
    }

    fn message(channel_id: ChannelId, id: MessageId, content: &str) -> Message {
        Message {
            id,
            channel_id,
            community_id: Snowflake(1),
            author: Author { id: Snowflake(5), name: "ada".into(), avatar_url: None },
            content: content.into(),
            attachments: vec![],
            reply_to: None,
            channel_access: ChannelAccess::default(),
        }
    }

    fn setup(content: &str) -> (Arc<Source>, MessageCache) {
        let source = Arc::new(Source {
            content: Mutex::new(Some(content.into())),
            fetches: Mutex::new(0),
        });
        let cache = MessageCache::new(source.clone());
        (source, cache)
    }

    fn key() -> MessageKey {
        MessageKey::new(Snowflake(10), Snowflake::lowest_at(Utc::now()))
    }

    #[tokio::test]
    async fn miss_fetches_once() {
        let (source, cache) = setup("hello");
        let key = key();

        assert_eq!(cache.get(key, true).await.unwrap().unwrap().content, "hello");
        assert_eq!(cache.get(key, false).await.unwrap().unwrap().content, "hello");
        assert_eq!(*source.fetches.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn dirty_entry_is_refetched_only_when_fresh_content_is_required() {
        let (source, cache) = setup("before");
        let key = key();
        cache.get(key, true).await.unwrap();

        *source.content.lock().unwrap() = Some("after".into());
        assert!(cache.mark_dirty(key).await);
        assert!(cache.is_dirty(key).await);

        assert_eq!(cache.get(key, true).await.unwrap().unwrap().content, "before");
        assert_eq!(*source.fetches.lock().unwrap(), 1);

        assert_eq!(cache.get(key, false).await.unwrap().unwrap().content, "after");
        assert!(!cache.is_dirty(key).await);
        assert_eq!(*source.fetches.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn vanished_message_is_dropped() {
        let (source, cache) = setup("x");
        let key = key();
        cache.get(key, true).await.unwrap();

        *source.content.lock().unwrap() = None;
        cache.mark_dirty(key).await;
        assert!(cache.get(key, false).await.unwrap().is_none());
        assert!(!cache.contains(key).await);
    }

    #[tokio::test]
    async fn replace_clears_dirty() {
        let (_, cache) = setup("x");
        let key = key();
        cache.get(key, true).await.unwrap();
        cache.mark_dirty(key).await;

        cache.replace(message(key.channel_id, key.message_id, "edited")).await;
        assert!(!cache.is_dirty(key).await);
        assert_eq!(cache.get(key, false).await.unwrap().unwrap().content, "edited");
    }

    #[tokio::test]
    async fn eviction_uses_id_age() {
        let (_, cache) = setup("x");
        let old = MessageKey::new(Snowflake(10), Snowflake::lowest_at(Utc::now() - chrono::Duration::days(9)));
        let fresh = key();
        cache.get(old, true).await.unwrap();
        cache.get(fresh, true).await.unwrap();

        let evicted = cache.evict_older_than(Utc::now() - chrono::Duration::days(7)).await;
        assert_eq!(evicted, 1);
        assert!(cache.contains(fresh).await);
        assert!(!cache.contains(old).await);
        assert_eq!(cache.len().await, 1);
    }
}
