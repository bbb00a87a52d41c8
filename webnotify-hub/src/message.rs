use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

/// Leading character of a frame carrying a notification
pub const MESSAGE_PREFIX: char = '0';

/// Leading character (and entire body) of a keepalive frame
pub const PING_PREFIX: char = '1';

/// Notification stored in the hub history
///
/// Immutable once created. The canonical form is `[HH:MM:SS] <text>` in
/// local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    timestamp: DateTime<Local>,
    text: String,
}

impl LogMessage {
    /// Create a message stamped with the current time
    pub fn new(text: impl Into<String>) -> Self {
        Self::at(Local::now(), text)
    }

    /// Create a message with an explicit timestamp
    pub fn at(timestamp: DateTime<Local>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

/// Outbound unit pushed to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A broadcast notification (live or replayed from history)
    Message(Arc<LogMessage>),
    /// Liveness signal without payload
    Ping,
}

impl Frame {
    /// Render the frame in its wire form (`0[HH:MM:SS] text` or `1`)
    pub fn to_wire(&self) -> String {
        self.to_string()
    }

    pub fn is_ping(&self) -> bool {
        matches!(self, Frame::Ping)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Message(message) => write!(f, "{}{}", MESSAGE_PREFIX, message),
            Frame::Ping => write!(f, "{}", PING_PREFIX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap()
    }

    #[test]
    fn test_canonical_form_is_zero_padded() {
        let message = LogMessage::at(fixed_time(), "deploy finished");
        assert_eq!(message.to_string(), "[09:05:07] deploy finished");
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let message = LogMessage::at(fixed_time(), "  spaced\ttext  ");
        assert_eq!(message.text(), "  spaced\ttext  ");
        assert_eq!(message.to_string(), "[09:05:07]   spaced\ttext  ");
    }

    #[test]
    fn test_message_frame_wire_form() {
        let frame = Frame::Message(Arc::new(LogMessage::at(fixed_time(), "hello")));
        assert_eq!(frame.to_wire(), "0[09:05:07] hello");
        assert!(!frame.is_ping());
    }

    #[test]
    fn test_ping_frame_wire_form() {
        assert_eq!(Frame::Ping.to_wire(), "1");
        assert!(Frame::Ping.is_ping());
    }

    #[test]
    fn test_new_uses_current_time() {
        let before = Local::now();
        let message = LogMessage::new("now");
        let after = Local::now();
        assert!(message.timestamp() >= before && message.timestamp() <= after);
    }
}
