//! ## brandvakt-intel::scheduler
//! **Background refresh task with graceful shutdown**
//!
//! Ticks every `check_interval` and calls `refresh_if_due`. Shutdown stops new ticks;
//! a refresh already in flight runs to completion or times out first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{info, info_span, Instrument};

use crate::cache::{RefreshError, ThreatIntelCache};

pub struct RefreshScheduler;

impl RefreshScheduler {
    /// Spawns the refresh loop on the current tokio runtime.
    pub fn spawn(cache: Arc<ThreatIntelCache>, check_interval: Duration) -> RefreshHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(check_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info!(check_interval = ?check_interval, "Threat-intel refresh scheduler started");

                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown_rx.changed() => break,
                        _ = ticker.tick() => {
                            // Outcomes are logged by the cache
                            if let Some(Err(RefreshError::NoSources)) = cache.refresh_if_due().await {
                                info!("No threat feeds configured, scheduler idle");
                                break;
                            }
                        }
                    }
                }

                info!("Threat-intel refresh scheduler stopped");
            }
            .instrument(info_span!("intel_refresh_task")),
        );

        RefreshHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals the loop to stop and waits for it.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        // Err only if the task already exited and dropped its receiver
        let _ = self.shutdown.send(true);
        self.task.await
    }
}
