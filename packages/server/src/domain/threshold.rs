//! Threshold chat state: a short, volatile message log.

use std::collections::VecDeque;

use super::entity::ThresholdMessage;

/// Sizes of the threshold log and its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdLimits {
    /// Messages retained in memory
    pub history: usize,
    /// Messages replayed to a newcomer
    pub catch_up: usize,
    pub max_message_chars: usize,
    pub max_name_chars: usize,
}

impl Default for ThresholdLimits {
    fn default() -> Self {
        Self {
            history: 50,
            catch_up: 10,
            max_message_chars: 1000,
            max_name_chars: 50,
        }
    }
}

/// The most recent messages spoken at the threshold, oldest first
#[derive(Debug)]
pub struct ThresholdLog {
    messages: VecDeque<ThresholdMessage>,
    capacity: usize,
}

impl ThresholdLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, dropping the oldest ones beyond capacity
    pub fn push(&mut self, message: ThresholdMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> Vec<ThresholdMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// How the threshold describes its population to each person in it
pub fn presence_phrase(count: usize) -> String {
    match count {
        0 => "The threshold is empty".to_string(),
        1 => "You are alone at the threshold".to_string(),
        2 => "One other is here".to_string(),
        n => format!("{} others are here", n - 1),
    }
}
