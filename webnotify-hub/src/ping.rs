//! Periodic keepalive pings

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::hub::Hub;

/// Background task calling [`Hub::ping`] once per interval
///
/// Holds only a weak reference to the hub, so it never keeps it alive.
/// Stopped through a single-use cancellation token.
pub(crate) struct PingScheduler {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PingScheduler {
    pub(crate) fn spawn(runtime: &Handle, hub: Weak<Hub>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!("Ping interval set to {} seconds", period.as_secs());

        let task = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let Some(hub) = hub.upgrade() else {
                    break;
                };

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = hub.ping() => {}
                }
            }

            info!("Ping scheduler terminating");
        });

        Self {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the task to finish
    pub(crate) async fn stop(&self) {
        self.cancel();

        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Ping scheduler task failed: {}", e);
                }
            }
        }
    }
}
