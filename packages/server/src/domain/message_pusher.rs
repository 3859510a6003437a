//! MessagePusher trait.
//!
//! Delivery of outbound frames to connected parties. The use case layer
//! depends on this trait; the transport lives in the infrastructure layer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{error::MessagePushError, value_object::PartyId};

/// Outbound frame queue of one socket
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Start delivering frames to `party_id` through `sender`
    async fn register_client(&self, party_id: PartyId, sender: PusherChannel);

    /// Stop delivering frames to `party_id`
    async fn unregister_client(&self, party_id: &PartyId);

    /// Send one frame to one party
    async fn push_to(&self, party_id: &PartyId, content: &str) -> Result<(), MessagePushError>;

    /// Send one frame to every target.
    ///
    /// Best effort: a target that is gone or whose channel is closed is
    /// skipped without failing the others.
    async fn broadcast(&self, targets: &[PartyId], content: &str)
    -> Result<(), MessagePushError>;
}
