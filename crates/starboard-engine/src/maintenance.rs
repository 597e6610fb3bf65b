use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::reactor::EventReactor;

/// Background task running [`EventReactor::sweep`] on the configured interval.
///
/// Exits once `shutdown` flips to true (or its sender is dropped). A sweep in
/// progress stops between prune batches, each of which has already committed.
pub async fn run_maintenance_loop(reactor: Arc<EventReactor>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(reactor.config().maintenance_interval);
    // The first tick fires immediately; skip it so a restart does not decay thresholds
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Maintenance loop stopped");
                    return;
                }
                continue;
            }
        }

        match reactor.sweep(&shutdown).await {
            Ok(report) => {
                if report.total() > 0 {
                    info!(
                        "Maintenance: pruned {} vote(s), {} reference(s), {} cached message(s), {} lock(s)",
                        report.votes, report.references, report.messages, report.locks
                    );
                }
            }
            Err(e) => {
                warn!("Maintenance error: {}", e);
            }
        }
    }
}
