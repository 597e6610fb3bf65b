use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use starboard_types::MessageKey;

/// One async mutex per message, so "check promotion then publish or update"
/// never interleaves for the same message while different messages proceed
/// in parallel.
#[derive(Default)]
pub struct MessageLocks {
    locks: Mutex<HashMap<MessageKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl MessageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: MessageKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on. Returns how many were released.
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starboard_types::Snowflake;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(MessageLocks::new());
        let key = MessageKey::new(Snowflake(1), Snowflake(2));

        let guard = locks.acquire(key).await;
        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(key).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = MessageLocks::new();
        let _a = locks.acquire(MessageKey::new(Snowflake(1), Snowflake(2))).await;
        let _b = locks.acquire(MessageKey::new(Snowflake(1), Snowflake(3))).await;
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = MessageLocks::new();
        let held = locks.acquire(MessageKey::new(Snowflake(1), Snowflake(2))).await;
        drop(locks.acquire(MessageKey::new(Snowflake(1), Snowflake(3))).await);

        assert_eq!(locks.prune(), 1);
        drop(held);
        assert_eq!(locks.prune(), 1);
    }
}
