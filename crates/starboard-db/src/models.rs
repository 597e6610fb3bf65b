//! Database row types, mapping directly to SQLite rows.
//! Converted into starboard-types models at the crate boundary.
use starboard_types::models::{BoardChannel, BoardReference, ChannelAccess};
use starboard_types::{MessageKey, Snowflake};

pub struct BoardReferenceRow {
    pub board_message_id: i64,
    pub board_channel_id: i64,
    pub original_message_id: i64,
    pub original_channel_id: i64,
}

pub struct BoardChannelRow {
    pub community_id: i64,
    pub channel_id: i64,
    pub restricted: bool,
    pub sensitive: bool,
}

impl From<BoardReferenceRow> for BoardReference {
    fn from(row: BoardReferenceRow) -> Self {
        BoardReference {
            board: MessageKey::new(
                Snowflake::from_sql(row.board_channel_id),
                Snowflake::from_sql(row.board_message_id),
            ),
            original: MessageKey::new(
                Snowflake::from_sql(row.original_channel_id),
                Snowflake::from_sql(row.original_message_id),
            ),
        }
    }
}

impl From<BoardChannelRow> for BoardChannel {
    fn from(row: BoardChannelRow) -> Self {
        BoardChannel {
            community_id: Snowflake::from_sql(row.community_id),
            channel_id: Snowflake::from_sql(row.channel_id),
            access: ChannelAccess {
                restricted: row.restricted,
                sensitive: row.sensitive,
            },
        }
    }
}
