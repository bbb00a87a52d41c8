//! In-process notification hub for webnotify
//!
//! This crate accepts short text notifications and fans them out in real time
//! to any number of streaming subscribers, keeping a bounded rolling history
//! so late joiners get recent context.
//!
//! # Features
//!
//! - Bounded history (last `buffer_size` messages, oldest evicted first)
//! - Replay-then-live delivery with no gap and no duplicate per subscriber
//! - Per-subscriber bounded queues with a configurable overflow policy
//! - Optional keepalive pings on a fixed interval
//! - Idempotent unsubscribe and one-shot shutdown
//! - Transport-agnostic streaming session (any `Sink<String>` + inbound `Stream`)
//!
//! # Wire Frames
//!
//! - `0[HH:MM:SS] <text>` - a notification (replayed or live)
//! - `1` - a keepalive ping
//!
//! # Example Usage
//!
//! ```no_run
//! use webnotify_hub::{Hub, HubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Hub::new(HubConfig::default().with_buffer_size(10))?;
//!
//!     hub.broadcast("build #42 passed").await?;
//!
//!     let mut subscription = hub.subscribe().await?;
//!     while let Some(frame) = subscription.recv().await {
//!         println!("{}", frame.to_wire());
//!     }
//!
//!     hub.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod hub;
pub mod message;
mod ping;
pub mod session;

// Re-exports
pub use config::{HubConfig, OverflowPolicy};
pub use error::{HubError, Result};
pub use history::History;
pub use hub::{Hub, SubscriberId, Subscription};
pub use message::{Frame, LogMessage};
pub use session::{Session, SessionEnd, SessionState, SessionSummary};
