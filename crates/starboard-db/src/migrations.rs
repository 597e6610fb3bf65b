use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE votes (
                community_id    INTEGER NOT NULL,
                channel_id      INTEGER NOT NULL,
                message_id      INTEGER NOT NULL,
                voter_id        INTEGER NOT NULL,
                UNIQUE(message_id, voter_id)
            );

            CREATE INDEX idx_votes_message
                ON votes(channel_id, message_id);

            CREATE TABLE board_references (
                board_message_id    INTEGER NOT NULL UNIQUE,
                board_channel_id    INTEGER NOT NULL,
                original_message_id INTEGER NOT NULL UNIQUE,
                original_channel_id INTEGER NOT NULL
            );

            CREATE INDEX idx_board_references_board_channel
                ON board_references(board_channel_id);

            CREATE TABLE board_channels (
                community_id    INTEGER NOT NULL UNIQUE,
                channel_id      INTEGER NOT NULL UNIQUE,
                restricted      INTEGER NOT NULL DEFAULT 0,
                sensitive       INTEGER NOT NULL DEFAULT 0
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
