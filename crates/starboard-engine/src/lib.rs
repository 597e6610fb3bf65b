//! Promotion engine: watches votes on chat messages and keeps a curated
//! board of the best ones in sync with the originals.
//!
//! - `ledger` - durable, deduplicated votes with in-memory counts
//! - `cache` - last-known message content with dirty tracking
//! - `threshold` - adaptive per-community promotion bar
//! - `references` - original <-> board copy directory
//! - `render` - pure board payload builder
//! - `reactor` - the event state machine tying it all together

pub mod boards;
pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod maintenance;
pub mod reactor;
pub mod references;
pub mod render;
pub mod store;
pub mod threshold;

use std::sync::Arc;

use starboard_db::Database;

pub use config::EngineConfig;
pub use error::{EngineError, StoreError};
pub use reactor::{EventReactor, Outcome, SweepReport};
pub use store::MessageStore;

/// Run a database call off the async runtime.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> Result<T, EngineError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| EngineError::Join(e.to_string()))?
        .map_err(EngineError::Database)
}
