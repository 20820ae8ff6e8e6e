//! Bus traffic entries
//!
//! `monitor` turns every received message into a `TrafficEntry`; `send`
//! prints the transmitted message and, with `--wait`, its response.

use crate::protocol::Message;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a frame relative to this controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficDirection {
    In,  // Bus -> controller
    Out, // Controller -> bus
}

/// One message seen on the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficEntry {
    pub timestamp: String, // HH:MM:SS.mmm
    pub direction: TrafficDirection,
    pub priority: u8,
    pub command: u8,
    pub response: bool,
    pub hash: u16,
    /// Message in text wire form
    pub text: String,
}

impl TrafficEntry {
    /// Current timestamp as HH:MM:SS.mmm
    #[inline]
    fn now() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }

    /// Entry for a received message
    pub fn incoming(message: &Message) -> Self {
        Self::with_direction(TrafficDirection::In, message)
    }

    /// Entry for a transmitted message
    pub fn outgoing(message: &Message) -> Self {
        Self::with_direction(TrafficDirection::Out, message)
    }

    fn with_direction(direction: TrafficDirection, message: &Message) -> Self {
        Self {
            timestamp: Self::now(),
            direction,
            priority: message.priority,
            command: message.command,
            response: message.response,
            hash: message.hash,
            text: message.encode_text(),
        }
    }

    /// Single JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// One output line, JSON or text
    pub fn render(&self, json: bool) -> String {
        if json {
            self.to_json()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for TrafficEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            TrafficDirection::In => "==>",
            TrafficDirection::Out => "<==",
        };
        write!(f, "{} {} {}", self.timestamp, arrow, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping_response() -> Message {
        let mut message = Message::new(0x18);
        message.response = true;
        message.hash = 0xDF24;
        message
    }

    #[test]
    fn test_timestamp_format() {
        let entry = TrafficEntry::incoming(&ping_response());
        // HH:MM:SS.mmm
        assert_eq!(entry.timestamp.len(), 12);
        assert_eq!(&entry.timestamp[2..3], ":");
        assert_eq!(&entry.timestamp[8..9], ".");
    }

    #[test]
    fn test_display_uses_text_form() {
        let entry = TrafficEntry::incoming(&ping_response());
        assert!(entry.to_string().ends_with("==> DF24 R 18 0"));
    }

    #[test]
    fn test_render_outgoing() {
        let mut request = Message::new(0x04);
        request.hash = 0xDF24;
        let entry = TrafficEntry::outgoing(&request);

        assert!(entry.render(false).ends_with("<== DF24   04 0"));
        assert!(entry.render(true).starts_with('{'));
        assert!(entry.render(true).contains("\"direction\":\"out\""));
    }

    #[test]
    fn test_json_fields() {
        let entry = TrafficEntry::outgoing(&ping_response());
        let json: serde_json::Value = serde_json::from_str(&entry.to_json()).unwrap();

        assert_eq!(json["direction"], "out");
        assert_eq!(json["command"], 0x18);
        assert_eq!(json["response"], true);
        assert_eq!(json["text"], "DF24 R 18 0");
    }
}
