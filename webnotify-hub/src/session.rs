//! Streaming session: one connection bridged to one hub subscription
//!
//! The session is transport-agnostic. Outbound frames go to any
//! `Sink<String>`; the inbound half is any stream of results and is read
//! only to notice when the peer goes away.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::hub::{Hub, SubscriberId};

/// Upper bound on closing the outbound half of a connection
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Subscribed,
    Streaming,
    Closed,
}

/// Why the streaming loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The hub closed the channel (slow-consumer eviction or shutdown)
    ChannelClosed,
    /// The peer went away or its inbound half failed
    PeerDisconnected,
    /// Writing a frame to the connection failed
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SubscriberId,
    pub frames_sent: u64,
    pub end: SessionEnd,
}

/// Connection wrapper driving a single subscription
pub struct Session<Tx> {
    hub: Arc<Hub>,
    outbound: Tx,
    state: SessionState,
}

impl<Tx> Session<Tx>
where
    Tx: Sink<String> + Unpin,
    Tx::Error: fmt::Display,
{
    pub fn new(hub: Arc<Hub>, outbound: Tx) -> Self {
        Self {
            hub,
            outbound,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Stream replay and live frames until either side goes away
    ///
    /// Fails only if the hub refuses the subscription (it is closed); the
    /// connection is closed in that case too.
    pub async fn run<Rx, M, E>(mut self, inbound: Rx) -> Result<SessionSummary>
    where
        Rx: Stream<Item = std::result::Result<M, E>> + Send + Unpin + 'static,
        M: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let mut subscription = match self.hub.subscribe().await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("Rejecting stream: {}", e);
                self.close_outbound().await;
                self.transition(SessionState::Closed);
                return Err(e);
            }
        };
        let id = subscription.id();
        self.transition(SessionState::Subscribed);

        let peer_gone = CancellationToken::new();
        let watcher = tokio::spawn(watch_inbound(
            Arc::clone(&self.hub),
            id,
            inbound,
            peer_gone.clone(),
        ));
        self.transition(SessionState::Streaming);

        let mut frames_sent = 0;
        let end = loop {
            let frame = tokio::select! {
                biased;
                _ = peer_gone.cancelled() => break SessionEnd::PeerDisconnected,
                frame = subscription.recv() => frame,
            };
            let Some(frame) = frame else {
                break SessionEnd::ChannelClosed;
            };

            // A half-open peer can park the write; the watcher still ends the session.
            let sent = tokio::select! {
                biased;
                _ = peer_gone.cancelled() => break SessionEnd::PeerDisconnected,
                sent = self.outbound.send(frame.to_wire()) => sent,
            };
            if let Err(e) = sent {
                warn!("Subscriber {}: write failed: {}", id, e);
                break SessionEnd::WriteFailed;
            }
            frames_sent += 1;
        };

        watcher.abort();
        // Release the receiver first so a broadcaster blocked on this queue can move on.
        drop(subscription);
        self.hub.unsubscribe(id).await;
        self.close_outbound().await;
        self.transition(SessionState::Closed);

        info!(
            "Stream for subscriber {} ended ({:?}, {} frames sent)",
            id, end, frames_sent
        );

        Ok(SessionSummary {
            id,
            frames_sent,
            end,
        })
    }

    async fn close_outbound(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.outbound.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error closing connection: {}", e),
            Err(_) => debug!("Timed out closing connection"),
        }
    }
}

/// Read until the peer disconnects or errors, then end the session and drop the registration
async fn watch_inbound<Rx, M, E>(
    hub: Arc<Hub>,
    id: SubscriberId,
    mut inbound: Rx,
    peer_gone: CancellationToken,
) where
    Rx: Stream<Item = std::result::Result<M, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        match inbound.next().await {
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!("Subscriber {}: read error: {}", id, e);
                break;
            }
            None => {
                debug!("Subscriber {}: peer disconnected", id);
                break;
            }
        }
    }

    peer_gone.cancel();
    hub.unsubscribe(id).await;
    debug!("Read watcher terminating for subscriber {}", id);
}
