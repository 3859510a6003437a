//! Message formatting utilities for client display.

use between_server::infrastructure::dto::websocket::{
    HistoryMessage, MessageType, ThresholdEventDto,
};
use chrono::{DateTime, Local};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the catch-up sent on arrival
    pub fn format_history(history: &HistoryMessage) -> String {
        let mut output = String::new();
        output.push_str("\n\n============================================================\n");
        if history.messages.is_empty() {
            output.push_str("(The threshold is quiet)\n");
        } else {
            for message in &history.messages {
                output.push_str(&Self::format_event(message));
            }
        }
        output.push_str("============================================================\n");
        output
    }

    /// Format a single threshold event
    pub fn format_event(event: &ThresholdEventDto) -> String {
        let time = Self::format_time(&event.timestamp);
        let content = event.content.as_deref().unwrap_or_default();
        match event.r#type {
            MessageType::Message => format!(
                "[{}] {}: {}\n",
                time,
                event.from.as_deref().unwrap_or("someone"),
                content
            ),
            MessageType::Arrival => format!("[{}] + {}\n", time, content),
            MessageType::Departure => format!("[{}] - {}\n", time, content),
            MessageType::Witness | MessageType::Presence => format!("[{}] ~ {}\n", time, content),
            _ => format!("[{}] {}\n", time, content),
        }
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    /// Local wall-clock time of an ISO-8601 timestamp, or the raw text if it
    /// does not parse
    fn format_time(timestamp: &str) -> String {
        DateTime::parse_from_rfc3339(timestamp)
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| timestamp.to_string())
    }
}
