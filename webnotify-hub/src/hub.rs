use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{HubConfig, OverflowPolicy};
use crate::error::{HubError, Result};
use crate::history::History;
use crate::message::{Frame, LogMessage};
use crate::ping::PingScheduler;

/// Hub-lifetime-unique subscriber identifier
pub type SubscriberId = u64;

/// Registered subscribers plus the bookkeeping that must change atomically with them
struct Registry {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Frame>>,
    closed: bool,
}

/// Receiving end of a hub registration
///
/// Yields the history replay first, then live frames. `recv` returns `None`
/// once the hub has unsubscribed this id or has been closed.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    replayed: usize,
    rx: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Number of history entries queued ahead of live traffic
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

/// In-process broadcast hub with bounded history
///
/// Broadcast (append + fan-out) and Subscribe (snapshot + register) both run
/// under the registry lock, so every broadcast is seen by a new subscriber
/// exactly once: either in its replay or as a live frame. Lock order is
/// always registry, then history.
///
/// A blocked fan-out holds the registry lock; `close` cancels `shutdown`
/// first so that fan-out gives up and the lock is released.
pub struct Hub {
    config: HubConfig,
    registry: Mutex<Registry>,
    history: RwLock<History>,
    closing: AtomicBool,
    shutdown: CancellationToken,
    ping: Option<PingScheduler>,
}

impl Hub {
    /// Create a hub; starts the ping scheduler when an interval is configured
    ///
    /// A running tokio runtime is required only when pings are enabled.
    pub fn new(config: HubConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let history = History::with_capacity(config.buffer_size)?;

        let runtime = match config.ping_interval() {
            Some(period) => Some((
                tokio::runtime::Handle::try_current().map_err(|_| HubError::NoRuntime)?,
                period,
            )),
            None => None,
        };

        let hub = Arc::new_cyclic(|weak| Self {
            ping: runtime.map(|(handle, period)| PingScheduler::spawn(&handle, weak.clone(), period)),
            config,
            registry: Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
                closed: false,
            }),
            history: RwLock::new(history),
            closing: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        });

        info!(
            "Hub created (buffer: {}, queue depth: {}, overflow: {:?})",
            hub.config.buffer_size, hub.config.queue_depth, hub.config.overflow
        );
        Ok(hub)
    }

    /// Register a new subscriber and queue the current history for replay
    pub async fn subscribe(&self) -> Result<Subscription> {
        let mut registry = self.registry.lock().await;
        if registry.closed || self.shutdown.is_cancelled() {
            return Err(HubError::Closed);
        }

        let history = self.history.read().await;
        let replayed = history.len();
        let (tx, rx) = mpsc::channel(replayed.saturating_add(self.config.queue_depth));
        for message in history.iter() {
            // Fresh channel sized for the whole replay; this cannot fail.
            let _ = tx.try_send(Frame::Message(Arc::clone(message)));
        }
        drop(history);

        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, tx);

        info!(
            "Registered subscriber {} (replay: {}, total: {})",
            id,
            replayed,
            registry.subscribers.len()
        );

        Ok(Subscription { id, replayed, rx })
    }

    /// Remove a subscriber and close its channel
    ///
    /// Returns `false` if the id was not registered (already removed), or if
    /// the hub shut down first; `close` removes every subscriber itself.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            registry = self.registry.lock() => registry,
        };
        match registry.subscribers.remove(&id) {
            Some(tx) => {
                drop(tx);
                info!(
                    "Deregistered subscriber {} (remaining: {})",
                    id,
                    registry.subscribers.len()
                );
                true
            }
            None => false,
        }
    }

    /// Record a notification and deliver it to every subscriber
    ///
    /// Reports [`HubError::Closed`] if the hub is closed, including when
    /// shutdown interrupts a delivery blocked on a full queue.
    pub async fn broadcast(&self, text: impl Into<String>) -> Result<()> {
        let mut registry = self.registry.lock().await;
        if registry.closed || self.shutdown.is_cancelled() {
            return Err(HubError::Closed);
        }

        let message = Arc::new(LogMessage::new(text));
        self.history.write().await.push(Arc::clone(&message));
        debug!("Broadcasting {}", message);

        if !self.fan_out(&mut registry, Frame::Message(message)).await {
            return Err(HubError::Closed);
        }
        Ok(())
    }

    /// Send a keepalive frame to every subscriber; history is untouched
    pub async fn ping(&self) {
        let mut registry = self.registry.lock().await;
        if registry.closed || self.shutdown.is_cancelled() {
            return;
        }
        debug!("Pinging {} subscribers", registry.subscribers.len());
        self.fan_out(&mut registry, Frame::Ping).await;
    }

    /// Deliver `frame` to every subscriber; `false` if shutdown interrupted delivery
    async fn fan_out(&self, registry: &mut Registry, frame: Frame) -> bool {
        let mut removed = Vec::new();
        let mut completed = true;

        for (&id, tx) in registry.subscribers.iter() {
            match self.config.overflow {
                OverflowPolicy::Block => {
                    tokio::select! {
                        biased;
                        sent = tx.send(frame.clone()) => {
                            if sent.is_err() {
                                removed.push(id);
                            }
                        }
                        _ = self.shutdown.cancelled() => {
                            debug!("Fan-out interrupted by shutdown");
                            completed = false;
                            break;
                        }
                    }
                }
                policy => match tx.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Closed(_)) => removed.push(id),
                    Err(TrySendError::Full(_)) if policy == OverflowPolicy::DropNewest => {
                        warn!("Subscriber {} queue full, dropping frame", id);
                    }
                    Err(TrySendError::Full(_)) => {
                        warn!("Subscriber {} too slow, disconnecting", id);
                        removed.push(id);
                    }
                },
            }
        }

        for id in removed {
            registry.subscribers.remove(&id);
            info!(
                "Removed subscriber {} (remaining: {})",
                id,
                registry.subscribers.len()
            );
        }
        completed
    }

    /// Write the retained history, one canonical line per message, oldest first
    pub async fn dump_history<W: fmt::Write>(&self, sink: &mut W) -> fmt::Result {
        let history = self.history.read().await;
        for message in history.iter() {
            writeln!(sink, "{}", message)?;
        }
        Ok(())
    }

    /// Retained messages, oldest first
    pub async fn history_snapshot(&self) -> Vec<Arc<LogMessage>> {
        self.history.read().await.snapshot()
    }

    /// Shut the hub down: interrupt blocked fan-outs, stop pings, then close
    /// every subscriber channel
    ///
    /// Only the first call has any effect.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            debug!("Hub already closed");
            return;
        }
        self.shutdown.cancel();

        if let Some(ping) = &self.ping {
            ping.stop().await;
        }

        let mut registry = self.registry.lock().await;
        registry.closed = true;
        let count = registry.subscribers.len();
        registry.subscribers.clear();

        info!("Hub closed ({} subscribers disconnected)", count);
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Get current subscriber count
    pub async fn subscriber_count(&self) -> usize {
        self.registry.lock().await.subscribers.len()
    }

    /// Get number of retained messages
    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        if !self.closing.load(Ordering::SeqCst) {
            if let Some(ping) = &self.ping {
                ping.cancel();
            }
        }
    }
}
