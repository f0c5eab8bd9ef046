//! Connectivity state and the auto-sync trigger.
//!
//! Connectivity is modeled as an explicit observable rather than ambient
//! global listeners: platform code reports transitions into
//! [`NetworkMonitor`], observers subscribe to a watch channel, and the
//! auto-sync task detaches cleanly through its handle.

use crate::engine::SyncEngine;
use hajiri_types::ConflictStrategy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable online/offline state, fed by platform connectivity events.
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Reports a connectivity transition. Subscribers are notified only on
    /// actual changes, so repeated reports of the same state are quiet.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Handle for the spawned auto-sync task. Shutting down detaches the
/// connectivity listener.
pub struct AutoSyncHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl AutoSyncHandle {
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        let _ = self.task.await;
    }
}

/// Spawns the auto-sync task: on every transition to online it triggers one
/// engine run with the default strategy. `in_flight` guards against
/// overlapping runs: a transition that arrives while a run is active is
/// dropped, not queued.
pub fn spawn_auto_sync(
    engine: Arc<SyncEngine>,
    monitor: &NetworkMonitor,
    in_flight: Arc<AtomicBool>,
) -> AutoSyncHandle {
    let mut online_rx = monitor.subscribe();
    let shutdown = Arc::new(Notify::new());
    let shutdown_rx = shutdown.clone();

    let task = tokio::spawn(async move {
        debug!("auto-sync listener attached");
        loop {
            tokio::select! {
                _ = shutdown_rx.notified() => {
                    debug!("auto-sync listener detached");
                    break;
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        debug!("connectivity source dropped, stopping auto-sync");
                        break;
                    }
                    if !*online_rx.borrow_and_update() {
                        continue;
                    }
                    if in_flight
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_err()
                    {
                        debug!("sync already in flight, ignoring auto trigger");
                        continue;
                    }

                    let engine = engine.clone();
                    let in_flight = in_flight.clone();
                    tokio::spawn(async move {
                        info!("back online, starting automatic sync");
                        let report = engine.run(ConflictStrategy::default(), None).await;
                        if report.failed_count > 0 {
                            warn!(
                                failed = report.failed_count,
                                synced = report.synced_count,
                                "automatic sync finished with failures"
                            );
                        } else {
                            info!(
                                synced = report.synced_count,
                                conflicts = report.conflict_count,
                                "automatic sync finished"
                            );
                        }
                        in_flight.store(false, Ordering::Release);
                    });
                }
            }
        }
    });

    AutoSyncHandle { shutdown, task }
}
