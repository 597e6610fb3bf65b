use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds between the Unix epoch and the platform epoch (2015-01-01T00:00:00Z).
pub const PLATFORM_EPOCH_MS: i64 = 1_420_070_400_000;

/// Bits below the embedded timestamp (worker, process, increment).
const TIMESTAMP_SHIFT: u32 = 22;

/// A 64-bit platform identifier whose upper bits embed the creation time.
///
/// Message age is always derived from the id, never from a fetched timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

pub type CommunityId = Snowflake;
pub type ChannelId = Snowflake;
pub type MessageId = Snowflake;
pub type UserId = Snowflake;

impl Snowflake {
    /// Milliseconds since the Unix epoch at which this id was minted.
    pub fn timestamp_millis(self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) as i64 + PLATFORM_EPOCH_MS
    }

    pub fn created_at(self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp_millis()).unwrap_or_default()
    }

    /// The smallest id that could have been minted at `at`.
    /// Any id strictly below it is older than `at`.
    pub fn lowest_at(at: DateTime<Utc>) -> Self {
        let ms = (at.timestamp_millis() - PLATFORM_EPOCH_MS).max(0) as u64;
        Snowflake(ms << TIMESTAMP_SHIFT)
    }

    /// SQLite stores integers as i64; platform ids never use the sign bit.
    pub fn to_sql(self) -> i64 {
        self.0 as i64
    }

    pub fn from_sql(value: i64) -> Self {
        Snowflake(value as u64)
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    fn from(value: u64) -> Self {
        Snowflake(value)
    }
}

/// Location of a message. The only key used by caches, the ledger and the
/// reference directory, so a refetched message never aliases a stale entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageKey {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

impl MessageKey {
    pub fn new(channel_id: ChannelId, message_id: MessageId) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.message_id.created_at()
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn created_at_reads_embedded_timestamp() {
        // 2016-04-30T11:18:25.796Z, a well-known id
        let id = Snowflake(175928847299117063);
        assert_eq!(id.timestamp_millis(), 1462015105796);
    }

    #[test]
    fn lowest_at_is_ordered_with_created_at() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let cutoff = Snowflake::lowest_at(at);
        assert_eq!(cutoff.created_at(), at);

        let older = Snowflake(cutoff.0 - 1);
        assert!(older.created_at() < at);
        assert!(older < cutoff);
    }

    #[test]
    fn lowest_at_clamps_before_epoch() {
        let at = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Snowflake::lowest_at(at), Snowflake(0));
    }
}
