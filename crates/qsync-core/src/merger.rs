// ── Live update merger ──
//
// Consumes the gateway's push stream for one view and patches the
// view's snapshot store, one update at a time in arrival order.

use std::sync::Arc;

use qsync_api::ControlUpdate;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::store::SnapshotStore;

/// Apply one update. Misses are dropped, never queued.
pub fn merge_update(store: &SnapshotStore, update: &ControlUpdate) -> bool {
    let hit = store.apply_update(update);
    if hit {
        trace!(component = %update.component, control = %update.control, "update merged");
    } else {
        debug!(
            component = %update.component,
            control = %update.control,
            "update for control outside the view, dropped"
        );
    }
    hit
}

/// Run the merge loop on an already-subscribed receiver.
///
/// Taking the receiver (rather than the gateway) means the subscription
/// exists before this task is first polled, so nothing published after
/// the caller subscribed is missed.
pub fn spawn_merger(
    store: Arc<SnapshotStore>,
    updates: broadcast::Receiver<Arc<ControlUpdate>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(merge_task(store, updates, cancel))
}

async fn merge_task(
    store: Arc<SnapshotStore>,
    mut updates: broadcast::Receiver<Arc<ControlUpdate>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            received = updates.recv() => match received {
                Ok(update) => {
                    merge_update(&store, &update);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live update stream lagged, some updates were lost");
                }
                Err(RecvError::Closed) => {
                    debug!("live update stream closed");
                    break;
                }
            }
        }
    }
    debug!("merger stopped");
}
