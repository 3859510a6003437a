//! Wire encodings the use cases depend on.
//!
//! Each real-time space turns domain state into text frames through one of
//! these traits; the JSON implementations live in the infrastructure layer.

use super::{
    entity::{Fragment, Party, ThresholdMessage},
    value_object::{FragmentId, SpaceName, Timestamp},
};

/// Wire encoding of one fragment space.
///
/// Implemented by the infrastructure layer for each kind of fragment.
pub trait FragmentCodec: Send + Sync + 'static {
    type Payload: Clone + Send + Sync + 'static;

    /// Full list of live fragments, sent once to a newcomer
    fn replay(&self, live: &[Fragment<Self::Payload>]) -> String;

    /// Identity message sent to a newcomer after the replay
    fn welcome(&self, party: &Party, count: usize) -> String;

    /// Membership view broadcast to everyone whenever it changes
    fn roster(&self, parties: &[Party]) -> String;

    /// A newly created fragment
    fn added(&self, fragment: &Fragment<Self::Payload>) -> String;

    /// A fragment that was evicted or expired
    fn faded(&self, id: &FragmentId) -> String;
}

/// Wire encoding of the sound-position space
pub trait VoiceCodec: Send + Sync {
    /// Identity and starting position, sent to a newcomer
    fn welcome(&self, party: &Party) -> String;

    /// Every voice's position and state
    fn positions(&self, parties: &[Party]) -> String;
}

/// Wire encoding of the threshold
pub trait ThresholdCodec: Send + Sync {
    /// Catch-up sent to a newcomer
    fn history(&self, recent: &[ThresholdMessage], now: Timestamp) -> String;

    /// A message, arrival, departure or witness
    fn event(&self, message: &ThresholdMessage) -> String;

    fn presence(&self, count: usize, phrase: &str, now: Timestamp) -> String;
}

/// Wire encoding of the generic presence counter
pub trait PresenceCodec: Send + Sync {
    fn presence(&self, space: &SpaceName, count: usize) -> String;
}
