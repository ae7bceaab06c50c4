//! Background reconciliation for one view.
//!
//! The sync task reacts to bus events from other views immediately and
//! polls the store on a fixed interval as a fallback for writers it cannot
//! hear (other processes). Worst-case convergence is one poll interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::view::ProfileView;

/// Default reconciliation interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Handle to a running sync task. Dropping it stops the task.
#[derive(Debug)]
pub struct SyncHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl ProfileView {
    /// Start keeping this view in sync. Must be called inside a tokio runtime.
    pub fn spawn_sync(self: &Arc<Self>, interval: Duration) -> SyncHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_sync(Arc::clone(self), interval, shutdown_rx));
        SyncHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

async fn run_sync(view: Arc<ProfileView>, interval: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut events = view.bus().subscribe();
    let mut bus_open = true;

    let interval = interval.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the view was just loaded.
    ticker.tick().await;

    info!(view = %view.id(), interval_ms = interval.as_millis() as u64, "Sync started");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!(view = %view.id(), "Sync shutdown requested");
                break;
            }

            event = events.recv(), if bus_open => match event {
                Ok(event) if event.origin == view.id() => {}
                Ok(event) => {
                    debug!(view = %view.id(), from = %event.origin, cause = %event.cause, "Change notification");
                    reload(&view).await;
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(view = %view.id(), missed, "Missed change notifications; reloading");
                    reload(&view).await;
                }
                Err(RecvError::Closed) => {
                    debug!(view = %view.id(), "Change bus closed; polling only");
                    bus_open = false;
                }
            },

            _ = ticker.tick() => {
                reload(&view).await;
            }
        }
    }

    info!(view = %view.id(), "Sync stopped");
}

/// Refresh off the async worker threads; the store may block on I/O.
async fn reload(view: &Arc<ProfileView>) {
    let view = Arc::clone(view);
    if let Err(e) = tokio::task::spawn_blocking(move || view.refresh()).await {
        warn!(error = %e, "Profile refresh panicked");
    }
}
