//! webnotify server library
//!
//! Configuration and HTTP routing for the notification server; re-exported
//! for integration testing.

pub mod config;
pub mod error;
pub mod http;

pub use config::{Cli, ServerConfig};
pub use error::ApiError;
pub use http::{router, AppState};
